//! Server-side anti-forgery session records.
//!
//! Writes are plain upserts, so two requests racing to initialise the same
//! session both succeed and the last write becomes the stored record.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub csrf_secret: String,
    /// Token cached after the first `GET /api/csrf-token`.
    pub csrf_token: Option<String>,
    /// Expiration time (Unix seconds)
    pub expires_at: i64,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a session that has not expired yet.
    pub async fn get(&self, id: &str, now: i64) -> Result<Option<SessionRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, csrf_secret, csrf_token, expires_at FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert or replace a session.
    pub async fn save(&self, record: &SessionRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, csrf_secret, csrf_token, expires_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                csrf_secret = excluded.csrf_secret,
                csrf_token = excluded.csrf_token,
                expires_at = excluded.expires_at",
        )
        .bind(&record.id)
        .bind(&record.csrf_secret)
        .bind(&record.csrf_token)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete sessions whose expiry has passed.
    pub async fn delete_expired(&self, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
