use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct StatsStore {
    pool: SqlitePool,
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub users: i64,
    pub mountains: i64,
    pub trails: i64,
    pub articles: i64,
    pub pending_reviews: i64,
    pub open_bug_reports: i64,
}

/// Signups on one calendar day (UTC).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// Items waiting for an admin.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingItems {
    pub pending_reviews: i64,
    pub pending_reports: i64,
}

/// One entry of the dashboard activity feed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityEvent {
    /// `new_user` or `new_article`.
    #[serde(rename = "type")]
    pub kind: String,
    /// User's full name or article title.
    pub title: String,
    pub timestamp: String,
    /// Role of the new user, or the article author's name.
    pub details: Option<String>,
}

/// Days covered by [`StatsStore::user_growth`], today included.
pub const GROWTH_DAYS: i64 = 7;

impl StatsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, sqlx::Error> {
        sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM mountains) AS mountains,
                (SELECT COUNT(*) FROM trails) AS trails,
                (SELECT COUNT(*) FROM articles) AS articles,
                (SELECT COUNT(*) FROM reviews WHERE status = 'pending') AS pending_reviews,
                (SELECT COUNT(*) FROM bug_reports WHERE status IN ('new', 'in_review')) AS open_bug_reports",
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Signups per day over the last [`GROWTH_DAYS`] days, oldest first.
    /// Days without signups are present with a zero count.
    pub async fn user_growth(&self) -> Result<Vec<DailyCount>, sqlx::Error> {
        sqlx::query_as(
            "WITH RECURSIVE days(day) AS (
                SELECT date('now', ?)
                UNION ALL
                SELECT date(day, '+1 day') FROM days WHERE day < date('now')
            )
            SELECT days.day AS date, COUNT(users.id) AS count
            FROM days
            LEFT JOIN users ON date(users.created_at) = days.day
            GROUP BY days.day
            ORDER BY days.day ASC",
        )
        .bind(format!("-{} days", GROWTH_DAYS - 1))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn pending_items(&self) -> Result<PendingItems, sqlx::Error> {
        sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM reviews WHERE status = 'pending') AS pending_reviews,
                (SELECT COUNT(*) FROM bug_reports WHERE status = 'new') AS pending_reports",
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Newest signups and articles merged by creation time, newest first.
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEvent>, sqlx::Error> {
        sqlx::query_as(
            "SELECT kind, title, timestamp, details FROM (
                SELECT * FROM (
                    SELECT 'new_user' AS kind, full_name AS title, created_at AS timestamp,
                           role AS details
                    FROM users ORDER BY created_at DESC, id DESC LIMIT ?1
                )
                UNION ALL
                SELECT * FROM (
                    SELECT 'new_article' AS kind, a.title AS title, a.created_at AS timestamp,
                           u.full_name AS details
                    FROM articles a LEFT JOIN users u ON u.id = a.author_id
                    ORDER BY a.created_at DESC, a.id DESC LIMIT ?1
                )
            )
            ORDER BY timestamp DESC
            LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
