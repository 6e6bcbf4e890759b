use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct TagStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagSummary {
    pub id: i64,
    pub name: String,
    pub article_count: i64,
}

impl TagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List tags with the number of articles using each.
    pub async fn list_with_counts(&self) -> Result<Vec<TagSummary>, sqlx::Error> {
        sqlx::query_as(
            "SELECT t.id, t.name, COUNT(at.article_id) AS article_count
             FROM tags t LEFT JOIN article_tags at ON at.tag_id = t.id
             GROUP BY t.id, t.name
             ORDER BY t.name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Tags attached to an article.
    pub async fn for_article(&self, article_id: i64) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as(
            "SELECT t.id, t.name FROM tags t
             JOIN article_tags at ON at.tag_id = t.id
             WHERE at.article_id = ?
             ORDER BY t.name ASC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Create a tag. Names are unique regardless of case.
    pub async fn create(&self, name: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a tag together with its article links.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM article_tags WHERE tag_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
