use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PoiStore {
    pool: SqlitePool,
}

/// A point of interest along a trail (spring, camp, summit, post...).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PointOfInterest {
    pub id: i64,
    pub trail_id: Option<i64>,
    pub name: String,
    pub kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub water_available: bool,
    pub tent_capacity: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PoiInput {
    pub trail_id: Option<i64>,
    pub name: String,
    pub kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub water_available: bool,
    pub tent_capacity: Option<i64>,
}

const POI_COLUMNS: &str =
    "id, trail_id, name, kind, latitude, longitude, description, water_available, tent_capacity";

impl PoiStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<PointOfInterest>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM points_of_interest ORDER BY id ASC",
            POI_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_for_trail(&self, trail_id: i64) -> Result<Vec<PointOfInterest>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM points_of_interest WHERE trail_id = ? ORDER BY id ASC",
            POI_COLUMNS
        ))
        .bind(trail_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<PointOfInterest>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM points_of_interest WHERE id = ?",
            POI_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create(&self, input: &PoiInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO points_of_interest (trail_id, name, kind, latitude, longitude, description,
                water_available, tent_capacity)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.trail_id)
        .bind(&input.name)
        .bind(&input.kind)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.description)
        .bind(input.water_available)
        .bind(input.tent_capacity)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, id: i64, input: &PoiInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE points_of_interest SET trail_id = ?, name = ?, kind = ?, latitude = ?,
                longitude = ?, description = ?, water_available = ?, tent_capacity = ?
             WHERE id = ?",
        )
        .bind(input.trail_id)
        .bind(&input.name)
        .bind(&input.kind)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.description)
        .bind(input.water_available)
        .bind(input.tent_capacity)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM points_of_interest WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
