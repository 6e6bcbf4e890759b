//! Scheduled cleanup of expired anti-forgery sessions.

use crate::db::Database;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    match db.sessions().delete_expired(now).await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired sessions", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired sessions: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; startup already ran a pass.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionRecord;

    #[tokio::test]
    async fn test_run_cleanup_removes_expired_sessions() {
        let db = Database::open(":memory:").await.unwrap();
        let record = |id: &str, expires_at: i64| SessionRecord {
            id: id.to_string(),
            csrf_secret: "secret".to_string(),
            csrf_token: None,
            expires_at,
        };
        db.sessions().save(&record("old", 1)).await.unwrap();
        db.sessions().save(&record("live", i64::MAX)).await.unwrap();

        run_cleanup(&db).await;

        assert!(db.sessions().get("old", 0).await.unwrap().is_none());
        assert!(db.sessions().get("live", 0).await.unwrap().is_some());
    }
}
