use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct GalleryStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GalleryPhoto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub mountain_id: Option<i64>,
    pub mountain_name: Option<String>,
    pub photo_path: String,
    pub photo_mimetype: String,
    pub photo_size: i64,
    pub author_id: Option<i64>,
    pub created_at: String,
}

pub struct NewGalleryPhoto<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub mountain_id: Option<i64>,
    pub photo_path: &'a str,
    pub photo_mimetype: &'a str,
    pub photo_size: i64,
    pub author_id: i64,
}

impl GalleryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List photos, newest first.
    pub async fn list(&self) -> Result<Vec<GalleryPhoto>, sqlx::Error> {
        sqlx::query_as(
            "SELECT g.id, g.title, g.description, g.mountain_id, m.name AS mountain_name,
                    g.photo_path, g.photo_mimetype, g.photo_size, g.author_id, g.created_at
             FROM gallery_photos g LEFT JOIN mountains m ON m.id = g.mountain_id
             ORDER BY g.created_at DESC, g.id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn create(&self, photo: &NewGalleryPhoto<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO gallery_photos (title, description, mountain_id, photo_path, photo_mimetype,
                photo_size, author_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(photo.title)
        .bind(photo.description)
        .bind(photo.mountain_id)
        .bind(photo.photo_path)
        .bind(photo.photo_mimetype)
        .bind(photo.photo_size)
        .bind(photo.author_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gallery_photos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
