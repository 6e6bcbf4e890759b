use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct TrailStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Trail {
    pub id: i64,
    pub mountain_id: i64,
    pub mountain_name: String,
    pub name: String,
    pub entrance_location: Option<String>,
    pub difficulty_scale: Option<i64>,
    pub safety_scale: Option<i64>,
    pub facility_quality_scale: Option<i64>,
    pub campsite_quality_scale: Option<i64>,
    pub scenery_scale: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Compact trail row used in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrailSummary {
    pub id: i64,
    pub mountain_id: i64,
    pub mountain_name: String,
    pub name: String,
    pub difficulty_scale: Option<i64>,
    pub safety_scale: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub status: String,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone)]
pub struct TrailInput {
    pub mountain_id: i64,
    pub name: String,
    pub entrance_location: Option<String>,
    pub difficulty_scale: Option<i64>,
    pub safety_scale: Option<i64>,
    pub facility_quality_scale: Option<i64>,
    pub campsite_quality_scale: Option<i64>,
    pub scenery_scale: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub description: Option<String>,
    pub status: String,
}

const SUMMARY_QUERY: &str = "SELECT t.id, t.mountain_id, m.name AS mountain_name, t.name,
        t.difficulty_scale, t.safety_scale, t.estimated_hours, t.status,
        (SELECT AVG(r.rating) FROM reviews r WHERE r.trail_id = t.id AND r.status = 'approved') AS average_rating,
        (SELECT COUNT(*) FROM reviews r WHERE r.trail_id = t.id AND r.status = 'approved') AS review_count
    FROM trails t JOIN mountains m ON m.id = t.mountain_id";

impl TrailStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<TrailSummary>, sqlx::Error> {
        sqlx::query_as(&format!("{} ORDER BY m.name ASC, t.name ASC, t.id ASC", SUMMARY_QUERY))
            .fetch_all(&self.pool)
            .await
    }

    /// List the trails of one mountain.
    pub async fn list_for_mountain(
        &self,
        mountain_id: i64,
    ) -> Result<Vec<TrailSummary>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{} WHERE t.mountain_id = ? ORDER BY t.name ASC, t.id ASC",
            SUMMARY_QUERY
        ))
        .bind(mountain_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Trail>, sqlx::Error> {
        sqlx::query_as(
            "SELECT t.id, t.mountain_id, m.name AS mountain_name, t.name, t.entrance_location,
                    t.difficulty_scale, t.safety_scale, t.facility_quality_scale,
                    t.campsite_quality_scale, t.scenery_scale, t.estimated_hours, t.description,
                    t.status, t.created_at
             FROM trails t JOIN mountains m ON m.id = t.mountain_id
             WHERE t.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create a trail. Fails with a foreign key violation for an unknown mountain.
    pub async fn create(&self, input: &TrailInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO trails (mountain_id, name, entrance_location, difficulty_scale, safety_scale,
                facility_quality_scale, campsite_quality_scale, scenery_scale, estimated_hours,
                description, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.mountain_id)
        .bind(&input.name)
        .bind(&input.entrance_location)
        .bind(input.difficulty_scale)
        .bind(input.safety_scale)
        .bind(input.facility_quality_scale)
        .bind(input.campsite_quality_scale)
        .bind(input.scenery_scale)
        .bind(input.estimated_hours)
        .bind(&input.description)
        .bind(&input.status)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, id: i64, input: &TrailInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE trails SET mountain_id = ?, name = ?, entrance_location = ?, difficulty_scale = ?,
                safety_scale = ?, facility_quality_scale = ?, campsite_quality_scale = ?,
                scenery_scale = ?, estimated_hours = ?, description = ?, status = ?
             WHERE id = ?",
        )
        .bind(input.mountain_id)
        .bind(&input.name)
        .bind(&input.entrance_location)
        .bind(input.difficulty_scale)
        .bind(input.safety_scale)
        .bind(input.facility_quality_scale)
        .bind(input.campsite_quality_scale)
        .bind(input.scenery_scale)
        .bind(input.estimated_hours)
        .bind(&input.description)
        .bind(&input.status)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a trail. Its reviews go with it; points of interest are detached.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trails WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
