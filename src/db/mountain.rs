use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct MountainStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Mountain {
    pub id: i64,
    pub name: String,
    pub summit_elevation_m: i64,
    pub administrative_location: Option<String>,
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
    pub trail_variety_scale: Option<i64>,
    pub created_at: String,
}

/// A mountain with aggregates over its trails and their approved reviews.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MountainSummary {
    pub id: i64,
    pub name: String,
    pub summit_elevation_m: i64,
    pub administrative_location: Option<String>,
    pub thumbnail_url: Option<String>,
    pub trail_variety_scale: Option<i64>,
    pub trail_count: i64,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Validated fields for creating or replacing a mountain.
#[derive(Debug, Clone)]
pub struct MountainInput {
    pub name: String,
    pub summit_elevation_m: i64,
    pub administrative_location: Option<String>,
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
    pub trail_variety_scale: Option<i64>,
}

const SUMMARY_QUERY: &str = "SELECT m.id, m.name, m.summit_elevation_m, m.administrative_location,
        m.thumbnail_url, m.trail_variety_scale,
        (SELECT COUNT(*) FROM trails t WHERE t.mountain_id = m.id) AS trail_count,
        (SELECT AVG(r.rating) FROM reviews r JOIN trails t ON t.id = r.trail_id
            WHERE t.mountain_id = m.id AND r.status = 'approved') AS average_rating,
        (SELECT COUNT(*) FROM reviews r JOIN trails t ON t.id = r.trail_id
            WHERE t.mountain_id = m.id AND r.status = 'approved') AS review_count
    FROM mountains m";

impl MountainStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List mountains with trail and review aggregates, ordered by name.
    pub async fn list_summaries(&self) -> Result<Vec<MountainSummary>, sqlx::Error> {
        sqlx::query_as(&format!("{} ORDER BY m.name ASC, m.id ASC", SUMMARY_QUERY))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Mountain>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, summit_elevation_m, administrative_location, summary, thumbnail_url,
                    trail_variety_scale, created_at
             FROM mountains WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create a mountain. Returns its ID.
    pub async fn create(&self, input: &MountainInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO mountains (name, summit_elevation_m, administrative_location, summary,
                thumbnail_url, trail_variety_scale)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.summit_elevation_m)
        .bind(&input.administrative_location)
        .bind(&input.summary)
        .bind(&input.thumbnail_url)
        .bind(input.trail_variety_scale)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Replace all editable fields of a mountain.
    pub async fn update(&self, id: i64, input: &MountainInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE mountains SET name = ?, summit_elevation_m = ?, administrative_location = ?,
                summary = ?, thumbnail_url = ?, trail_variety_scale = ?
             WHERE id = ?",
        )
        .bind(&input.name)
        .bind(input.summit_elevation_m)
        .bind(&input.administrative_location)
        .bind(&input.summary)
        .bind(&input.thumbnail_url)
        .bind(input.trail_variety_scale)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a mountain. Fails with a foreign key violation while trails reference it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM mountains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete several mountains atomically. Either all deletable rows go or none do.
    pub async fn delete_many(&self, ids: &[i64]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;
        for id in ids {
            let result = sqlx::query("DELETE FROM mountains WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    fn input(name: &str) -> MountainInput {
        MountainInput {
            name: name.to_string(),
            summit_elevation_m: 3_676,
            administrative_location: Some("Jawa Timur".to_string()),
            summary: None,
            thumbnail_url: None,
            trail_variety_scale: Some(5),
        }
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.mountains().create(&input("Semeru")).await.unwrap();

        let mountain = db.mountains().get(id).await.unwrap().unwrap();
        assert_eq!(mountain.name, "Semeru");
        assert_eq!(mountain.summit_elevation_m, 3_676);

        let mut changed = input("Mahameru");
        changed.summit_elevation_m = 3_678;
        assert!(db.mountains().update(id, &changed).await.unwrap());

        let mountain = db.mountains().get(id).await.unwrap().unwrap();
        assert_eq!(mountain.name, "Mahameru");
        assert_eq!(mountain.summit_elevation_m, 3_678);

        assert!(!db.mountains().update(999, &changed).await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_aggregates() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.mountains().create(&input("Rinjani")).await.unwrap();
        db.mountains().create(&input("Agung")).await.unwrap();

        sqlx::query("INSERT INTO trails (mountain_id, name) VALUES (?, 'Sembalun')")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();

        let summaries = db.mountains().list_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Agung");
        assert_eq!(summaries[0].trail_count, 0);
        assert_eq!(summaries[1].trail_count, 1);
        assert_eq!(summaries[1].review_count, 0);
        assert!(summaries[1].average_rating.is_none());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_trails() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.mountains().create(&input("Merbabu")).await.unwrap();
        sqlx::query("INSERT INTO trails (mountain_id, name) VALUES (?, 'Selo')")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.mountains().delete(id).await.unwrap_err();
        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
        assert!(db.mountains().get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_many_is_atomic() {
        let db = Database::open(":memory:").await.unwrap();
        let free = db.mountains().create(&input("Prau")).await.unwrap();
        let used = db.mountains().create(&input("Sindoro")).await.unwrap();
        sqlx::query("INSERT INTO trails (mountain_id, name) VALUES (?, 'Kledung')")
            .bind(used)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.mountains().delete_many(&[free, used]).await.is_err());
        assert!(db.mountains().get(free).await.unwrap().is_some());

        assert_eq!(db.mountains().delete_many(&[free, 999]).await.unwrap(), 1);
        assert!(db.mountains().get(free).await.unwrap().is_none());
    }
}
