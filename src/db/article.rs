use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use super::Tag;

#[derive(Clone)]
pub struct ArticleStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub status: String,
    pub category: Option<String>,
    pub cover_image_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    slug: String,
    body: String,
    author_id: Option<i64>,
    author_name: Option<String>,
    status: String,
    category: Option<String>,
    cover_image_url: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ArticleRow {
    fn with_tags(self, tags: Vec<Tag>) -> Article {
        Article {
            id: self.id,
            title: self.title,
            slug: self.slug,
            body: self.body,
            author_id: self.author_id,
            author_name: self.author_name,
            status: self.status,
            category: self.category,
            cover_image_url: self.cover_image_url,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            tags,
        }
    }
}

/// Article without its body, for listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author_name: Option<String>,
    pub status: String,
    pub category: Option<String>,
    pub cover_image_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ArticleInput {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: String,
    pub category: Option<String>,
    pub cover_image_url: Option<String>,
    /// When set, replaces the article's tag set.
    pub tag_ids: Option<Vec<i64>>,
}

const ARTICLE_SELECT: &str = "SELECT a.id, a.title, a.slug, a.body, a.author_id,
        u.full_name AS author_name, a.status, a.category, a.cover_image_url, a.published_at,
        a.created_at, a.updated_at
    FROM articles a LEFT JOIN users u ON u.id = a.author_id";

const SUMMARY_SELECT: &str = "SELECT a.id, a.title, a.slug, u.full_name AS author_name, a.status,
        a.category, a.cover_image_url, a.published_at, a.created_at
    FROM articles a LEFT JOIN users u ON u.id = a.author_id";

/// Derive a URL slug from a title: lowercase, whitespace to dashes,
/// other non-word characters dropped, dash runs collapsed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else if c.is_alphanumeric() || c == '_' {
            slug.push(c);
        }
    }
    slug.trim_matches('-').to_string()
}

impl ArticleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all articles, newest first.
    pub async fn list(&self) -> Result<Vec<ArticleSummary>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{} ORDER BY a.created_at DESC, a.id DESC",
            SUMMARY_SELECT
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// List published articles, most recently published first.
    pub async fn list_published(&self) -> Result<Vec<ArticleSummary>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{} WHERE a.status = 'published' ORDER BY a.published_at DESC, a.id DESC",
            SUMMARY_SELECT
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>, sqlx::Error> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!("{} WHERE a.id = ?", ARTICLE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.attach_tags(row).await
    }

    /// Get a published article by slug.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Article>, sqlx::Error> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!(
            "{} WHERE a.slug = ? AND a.status = 'published'",
            ARTICLE_SELECT
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_tags(row).await
    }

    async fn attach_tags(&self, row: Option<ArticleRow>) -> Result<Option<Article>, sqlx::Error> {
        let Some(row) = row else {
            return Ok(None);
        };
        let tags: Vec<Tag> = sqlx::query_as(
            "SELECT t.id, t.name FROM tags t
             JOIN article_tags at ON at.tag_id = t.id
             WHERE at.article_id = ?
             ORDER BY t.name ASC",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(row.with_tags(tags)))
    }

    /// Create an article and its tag links atomically. Returns the article ID.
    pub async fn create(&self, author_id: i64, input: &ArticleInput) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO articles (title, slug, body, author_id, status, category, cover_image_url,
                published_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, CASE WHEN ? = 'published' THEN datetime('now') END)",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.body)
        .bind(author_id)
        .bind(&input.status)
        .bind(&input.category)
        .bind(&input.cover_image_url)
        .bind(&input.status)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        if let Some(tag_ids) = &input.tag_ids {
            replace_tags(&mut tx, id, tag_ids).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Replace an article's fields. `published_at` is kept once set.
    pub async fn update(&self, id: i64, input: &ArticleInput) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE articles SET title = ?, slug = ?, body = ?, status = ?, category = ?,
                cover_image_url = ?,
                published_at = COALESCE(published_at, CASE WHEN ? = 'published' THEN datetime('now') END),
                updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.body)
        .bind(&input.status)
        .bind(&input.category)
        .bind(&input.cover_image_url)
        .bind(&input.status)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(tag_ids) = &input.tag_ids {
            replace_tags(&mut tx, id, tag_ids).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn replace_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    article_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await?;
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    async fn author(db: &Database) -> i64 {
        sqlx::query(
            "INSERT INTO users (full_name, username, email, password_hash, role)
             VALUES ('Editor', 'editor', 'editor@example.com', 'x', 'admin')",
        )
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid()
    }

    fn input(title: &str, status: &str, tag_ids: Option<Vec<i64>>) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            slug: slugify(title),
            body: "Body text".to_string(),
            status: status.to_string(),
            category: Some("tips".to_string()),
            cover_image_url: None,
            tag_ids,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Tips & Tricks:  Camping!  "), "tips-tricks-camping");
        assert_eq!(slugify("Gunung -- Semeru"), "gunung-semeru");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn test_create_with_tags() {
        let db = Database::open(":memory:").await.unwrap();
        let author_id = author(&db).await;
        let gear = db.tags().create("Gear").await.unwrap();
        let camp = db.tags().create("Camping").await.unwrap();

        let id = db
            .articles()
            .create(author_id, &input("Packing List", "draft", Some(vec![gear, camp])))
            .await
            .unwrap();

        let article = db.articles().get(id).await.unwrap().unwrap();
        assert_eq!(article.slug, "packing-list");
        assert_eq!(article.author_name.as_deref(), Some("Editor"));
        assert!(article.published_at.is_none());
        let names: Vec<&str> = article.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Camping", "Gear"]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let db = Database::open(":memory:").await.unwrap();
        let author_id = author(&db).await;
        db.articles()
            .create(author_id, &input("Same Title", "draft", None))
            .await
            .unwrap();

        let err = db
            .articles()
            .create(author_id, &input("Same Title", "draft", None))
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_unique_violation());
    }

    #[tokio::test]
    async fn test_unknown_tag_rolls_back_create() {
        let db = Database::open(":memory:").await.unwrap();
        let author_id = author(&db).await;

        let err = db
            .articles()
            .create(author_id, &input("Tagged", "draft", Some(vec![404])))
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
        assert!(db.articles().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publishing_sets_published_at_once() {
        let db = Database::open(":memory:").await.unwrap();
        let author_id = author(&db).await;
        let id = db
            .articles()
            .create(author_id, &input("Draft", "draft", None))
            .await
            .unwrap();
        assert!(db.articles().list_published().await.unwrap().is_empty());

        assert!(db
            .articles()
            .update(id, &input("Draft", "published", None))
            .await
            .unwrap());
        let published_at = db.articles().get(id).await.unwrap().unwrap().published_at;
        assert!(published_at.is_some());

        db.articles()
            .update(id, &input("Draft", "published", None))
            .await
            .unwrap();
        let again = db.articles().get(id).await.unwrap().unwrap().published_at;
        assert_eq!(published_at, again);

        let found = db.articles().get_published_by_slug("draft").await.unwrap();
        assert!(found.is_some());
        assert_eq!(db.articles().list_published().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_tag_set() {
        let db = Database::open(":memory:").await.unwrap();
        let author_id = author(&db).await;
        let a = db.tags().create("A").await.unwrap();
        let b = db.tags().create("B").await.unwrap();
        let id = db
            .articles()
            .create(author_id, &input("Tags", "draft", Some(vec![a])))
            .await
            .unwrap();

        db.articles()
            .update(id, &input("Tags", "draft", Some(vec![b])))
            .await
            .unwrap();
        let tags = db.articles().get(id).await.unwrap().unwrap().tags;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, b);

        // Omitting tag_ids leaves the set alone.
        db.articles()
            .update(id, &input("Tags", "draft", None))
            .await
            .unwrap();
        assert_eq!(db.articles().get(id).await.unwrap().unwrap().tags.len(), 1);
    }

    #[tokio::test]
    async fn test_draft_hidden_by_slug() {
        let db = Database::open(":memory:").await.unwrap();
        let author_id = author(&db).await;
        db.articles()
            .create(author_id, &input("Hidden", "draft", None))
            .await
            .unwrap();

        assert!(db
            .articles()
            .get_published_by_slug("hidden")
            .await
            .unwrap()
            .is_none());
    }
}
