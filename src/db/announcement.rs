//! Announcements. Validity bounds are `YYYY-MM-DD` dates compared against
//! the current UTC date; the end date is inclusive.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct AnnouncementStore {
    pool: SqlitePool,
}

/// Announcement as managed by administrators.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub mountain_id: Option<i64>,
    pub trail_id: Option<i64>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub status: String,
    /// `scheduled`, `ongoing` or `expired` for published entries, the raw status otherwise.
    pub display_status: String,
    pub created_by: Option<i64>,
    pub created_at: String,
}

/// Announcement as shown to visitors.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PublicAnnouncement {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub mountain_id: Option<i64>,
    pub mountain_name: Option<String>,
    pub trail_id: Option<i64>,
    pub trail_name: Option<String>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct AnnouncementInput {
    pub title: String,
    pub body: String,
    pub mountain_id: Option<i64>,
    pub trail_id: Option<i64>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub status: String,
}

const ADMIN_SELECT: &str = "SELECT id, title, body, mountain_id, trail_id, valid_from, valid_until,
        status,
        CASE
            WHEN status != 'published' THEN status
            WHEN valid_from IS NOT NULL AND valid_from > date('now') THEN 'scheduled'
            WHEN valid_until IS NOT NULL AND valid_until < date('now') THEN 'expired'
            ELSE 'ongoing'
        END AS display_status,
        created_by, created_at
    FROM announcements";

const PUBLIC_SELECT: &str = "SELECT a.id, a.title, a.body, a.mountain_id, m.name AS mountain_name,
        a.trail_id, t.name AS trail_name, a.valid_from, a.valid_until, a.created_at
    FROM announcements a
    LEFT JOIN mountains m ON m.id = a.mountain_id
    LEFT JOIN trails t ON t.id = a.trail_id
    WHERE a.status = 'published'
      AND (a.valid_from IS NULL OR a.valid_from <= date('now'))
      AND (a.valid_until IS NULL OR a.valid_until >= date('now'))";

impl AnnouncementStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all announcements, newest first.
    pub async fn list(&self) -> Result<Vec<Announcement>, sqlx::Error> {
        sqlx::query_as(&format!("{} ORDER BY created_at DESC, id DESC", ADMIN_SELECT))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Announcement>, sqlx::Error> {
        sqlx::query_as(&format!("{} WHERE id = ?", ADMIN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Published announcements valid today, newest first, optionally limited.
    pub async fn list_current(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<PublicAnnouncement>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{} ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
            PUBLIC_SELECT
        ))
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
    }

    /// A single announcement, only if published and valid today.
    pub async fn get_current(&self, id: i64) -> Result<Option<PublicAnnouncement>, sqlx::Error> {
        sqlx::query_as(&format!("{} AND a.id = ?", PUBLIC_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create(
        &self,
        created_by: i64,
        input: &AnnouncementInput,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO announcements (title, body, mountain_id, trail_id, valid_from, valid_until,
                status, created_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.body)
        .bind(input.mountain_id)
        .bind(input.trail_id)
        .bind(&input.valid_from)
        .bind(&input.valid_until)
        .bind(&input.status)
        .bind(created_by)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, id: i64, input: &AnnouncementInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE announcements SET title = ?, body = ?, mountain_id = ?, trail_id = ?,
                valid_from = ?, valid_until = ?, status = ?
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.body)
        .bind(input.mountain_id)
        .bind(input.trail_id)
        .bind(&input.valid_from)
        .bind(&input.valid_until)
        .bind(&input.status)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    async fn setup() -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let admin = sqlx::query(
            "INSERT INTO users (full_name, username, email, password_hash, role)
             VALUES ('Admin', 'admin', 'admin@example.com', 'x', 'admin')",
        )
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid();
        (db, admin)
    }

    fn input(title: &str, status: &str, from: Option<&str>, until: Option<&str>) -> AnnouncementInput {
        AnnouncementInput {
            title: title.to_string(),
            body: "Body".to_string(),
            mountain_id: None,
            trail_id: None,
            valid_from: from.map(str::to_string),
            valid_until: until.map(str::to_string),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn test_display_status() {
        let (db, admin) = setup().await;
        let store = db.announcements();

        let draft = store
            .create(admin, &input("Draft", "draft", None, None))
            .await
            .unwrap();
        let scheduled = store
            .create(admin, &input("Later", "published", Some("2999-01-01"), None))
            .await
            .unwrap();
        let expired = store
            .create(
                admin,
                &input("Old", "published", Some("2000-01-01"), Some("2000-12-31")),
            )
            .await
            .unwrap();
        let ongoing = store
            .create(
                admin,
                &input("Now", "published", Some("2000-01-01"), Some("2999-12-31")),
            )
            .await
            .unwrap();

        for (id, expected) in [
            (draft, "draft"),
            (scheduled, "scheduled"),
            (expired, "expired"),
            (ongoing, "ongoing"),
        ] {
            let announcement = store.get(id).await.unwrap().unwrap();
            assert_eq!(announcement.display_status, expected, "{}", announcement.title);
        }
    }

    #[tokio::test]
    async fn test_end_date_is_inclusive() {
        let (db, admin) = setup().await;
        let today: (String,) = sqlx::query_as("SELECT date('now')")
            .fetch_one(db.pool())
            .await
            .unwrap();

        let id = db
            .announcements()
            .create(
                admin,
                &input("Last day", "published", Some("2000-01-01"), Some(&today.0)),
            )
            .await
            .unwrap();

        assert!(db.announcements().get_current(id).await.unwrap().is_some());
        assert_eq!(
            db.announcements().get(id).await.unwrap().unwrap().display_status,
            "ongoing"
        );
    }

    #[tokio::test]
    async fn test_public_listing_filters_and_limits() {
        let (db, admin) = setup().await;
        let store = db.announcements();

        store
            .create(admin, &input("Draft", "draft", None, None))
            .await
            .unwrap();
        let expired = store
            .create(admin, &input("Old", "published", None, Some("2000-01-01")))
            .await
            .unwrap();
        for i in 0..4 {
            store
                .create(admin, &input(&format!("Open {}", i), "published", None, None))
                .await
                .unwrap();
        }

        assert_eq!(store.list_current(None).await.unwrap().len(), 4);

        let latest = store.list_current(Some(3)).await.unwrap();
        let titles: Vec<&str> = latest.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Open 3", "Open 2", "Open 1"]);

        assert!(store.get_current(expired).await.unwrap().is_none());
        assert!(store.get(expired).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, admin) = setup().await;
        let id = db
            .announcements()
            .create(admin, &input("Trail closed", "draft", None, None))
            .await
            .unwrap();

        assert!(db
            .announcements()
            .update(id, &input("Trail closed", "published", None, None))
            .await
            .unwrap());
        assert!(db.announcements().get_current(id).await.unwrap().is_some());

        assert!(db.announcements().delete(id).await.unwrap());
        assert!(db.announcements().get(id).await.unwrap().is_none());
    }
}
