use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ReviewStore {
    pool: SqlitePool,
}

/// Review as seen by moderators.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub trail_id: i64,
    pub trail_name: String,
    pub user_id: i64,
    pub username: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Approved review as shown on a trail page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewSummary {
    pub id: i64,
    pub username: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

impl ReviewStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Submit a review. New reviews wait for moderation.
    pub async fn create(
        &self,
        trail_id: i64,
        user_id: i64,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO reviews (trail_id, user_id, rating, comment, status) VALUES (?, ?, ?, ?, 'pending')",
        )
        .bind(trail_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// List every review, newest first.
    pub async fn list(&self) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as(
            "SELECT r.id, r.trail_id, t.name AS trail_name, r.user_id, u.username, r.rating,
                    r.comment, r.status, r.created_at
             FROM reviews r
             JOIN trails t ON t.id = r.trail_id
             JOIN users u ON u.id = r.user_id
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_approved_for_trail(
        &self,
        trail_id: i64,
    ) -> Result<Vec<ReviewSummary>, sqlx::Error> {
        sqlx::query_as(
            "SELECT r.id, u.username, r.rating, r.comment, r.created_at
             FROM reviews r JOIN users u ON u.id = r.user_id
             WHERE r.trail_id = ? AND r.status = 'approved'
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .bind(trail_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn set_status(&self, id: i64, status: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE reviews SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
