use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct BugReportStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BugReport {
    pub id: i64,
    pub reporter_id: Option<i64>,
    pub reporter_name: Option<String>,
    pub title: String,
    pub description: String,
    pub page: Option<String>,
    pub screenshot_path: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub admin_note: Option<String>,
    pub reported_at: String,
    pub resolved_at: Option<String>,
}

pub struct NewBugReport<'a> {
    pub reporter_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub page: Option<&'a str>,
    pub screenshot_path: Option<&'a str>,
}

impl BugReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, report: &NewBugReport<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO bug_reports (reporter_id, title, description, page, screenshot_path, status)
             VALUES (?, ?, ?, ?, ?, 'new')",
        )
        .bind(report.reporter_id)
        .bind(report.title)
        .bind(report.description)
        .bind(report.page)
        .bind(report.screenshot_path)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// List reports: new first, then in review, then the rest. Newest first within each.
    pub async fn list(&self) -> Result<Vec<BugReport>, sqlx::Error> {
        sqlx::query_as(
            "SELECT b.id, b.reporter_id, u.full_name AS reporter_name, b.title, b.description,
                    b.page, b.screenshot_path, b.status, b.priority, b.admin_note, b.reported_at,
                    b.resolved_at
             FROM bug_reports b LEFT JOIN users u ON u.id = b.reporter_id
             ORDER BY CASE b.status WHEN 'new' THEN 0 WHEN 'in_review' THEN 1 ELSE 2 END,
                      b.reported_at DESC, b.id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Triage a report. `resolved_at` is stamped on the move to `resolved`
    /// and cleared when the report leaves that state.
    pub async fn update(
        &self,
        id: i64,
        status: &str,
        priority: Option<&str>,
        admin_note: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bug_reports SET status = ?1, priority = ?2, admin_note = ?3,
                resolved_at = CASE WHEN ?1 = 'resolved' THEN COALESCE(resolved_at, datetime('now')) END
             WHERE id = ?4",
        )
        .bind(status)
        .bind(priority)
        .bind(admin_note)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bug_reports WHERE id = ?")
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

    async fn setup() -> Database {
        let db = Database::open(":memory:").await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, full_name, username, email, password_hash) VALUES (1, 'Reporter', 'rep', 'rep@example.com', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    fn report(title: &str) -> NewBugReport<'_> {
        NewBugReport {
            reporter_id: 1,
            title,
            description: "Something broke",
            page: Some("/mountains"),
            screenshot_path: None,
        }
    }

    #[tokio::test]
    async fn test_ordering_by_status() {
        let db = setup().await;
        let store = db.bug_reports();

        let resolved = store.create(&report("resolved")).await.unwrap();
        let reviewing = store.create(&report("reviewing")).await.unwrap();
        let fresh = store.create(&report("fresh")).await.unwrap();

        store.update(resolved, "resolved", None, None).await.unwrap();
        store.update(reviewing, "in_review", Some("high"), None).await.unwrap();

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![fresh, reviewing, resolved]);
    }

    #[tokio::test]
    async fn test_resolved_at_lifecycle() {
        let db = setup().await;
        let store = db.bug_reports();
        let id = store.create(&report("bug")).await.unwrap();

        assert!(store
            .update(id, "resolved", Some("low"), Some("fixed in deploy"))
            .await
            .unwrap());
        let listed = store.list().await.unwrap();
        assert!(listed[0].resolved_at.is_some());
        assert_eq!(listed[0].admin_note.as_deref(), Some("fixed in deploy"));
        assert_eq!(listed[0].reporter_name.as_deref(), Some("Reporter"));

        store.update(id, "in_review", None, None).await.unwrap();
        assert!(store.list().await.unwrap()[0].resolved_at.is_none());

        assert!(!store.update(999, "resolved", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup().await;
        let id = db.bug_reports().create(&report("bug")).await.unwrap();
        assert!(db.bug_reports().delete(id).await.unwrap());
        assert!(db.bug_reports().list().await.unwrap().is_empty());
    }
}
