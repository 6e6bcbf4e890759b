mod announcement;
mod article;
mod bug_report;
mod gallery;
mod mountain;
mod poi;
mod review;
mod session;
mod stats;
mod tag;
mod trail;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use announcement::{Announcement, AnnouncementInput, AnnouncementStore, PublicAnnouncement};
pub use article::{Article, ArticleInput, ArticleStore, ArticleSummary, slugify};
pub use bug_report::{BugReport, BugReportStore, NewBugReport};
pub use gallery::{GalleryPhoto, GalleryStore, NewGalleryPhoto};
pub use mountain::{Mountain, MountainInput, MountainStore, MountainSummary};
pub use poi::{PoiInput, PoiStore, PointOfInterest};
pub use review::{Review, ReviewStore, ReviewSummary};
pub use session::{SessionRecord, SessionStore};
pub use stats::{ActivityEvent, DailyCount, DashboardStats, GROWTH_DAYS, PendingItems, StatsStore};
pub use tag::{Tag, TagStore, TagSummary};
pub use trail::{Trail, TrailInput, TrailStore, TrailSummary};
pub use user::{NewUser, ProfileUpdate, User, UserProfile, UserRole, UserStatus, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        if version < 2 {
            self.migrate_v2().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    full_name TEXT NOT NULL,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'user',
                    status TEXT NOT NULL DEFAULT 'active',
                    domicile TEXT,
                    institution TEXT,
                    phone TEXT,
                    avatar_url TEXT,
                    last_online_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_role ON users(role)",
                // Anti-forgery sessions, keyed by the id carried in the session cookie
                "CREATE TABLE sessions (
                    id TEXT PRIMARY KEY NOT NULL,
                    csrf_secret TEXT NOT NULL,
                    csrf_token TEXT,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_sessions_expires_at ON sessions(expires_at)",
                "CREATE TABLE mountains (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    summit_elevation_m INTEGER NOT NULL,
                    administrative_location TEXT,
                    summary TEXT,
                    thumbnail_url TEXT,
                    trail_variety_scale INTEGER,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                // No ON DELETE action: a mountain cannot be removed while trails reference it
                "CREATE TABLE trails (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mountain_id INTEGER NOT NULL REFERENCES mountains(id),
                    name TEXT NOT NULL,
                    entrance_location TEXT,
                    difficulty_scale INTEGER,
                    safety_scale INTEGER,
                    facility_quality_scale INTEGER,
                    campsite_quality_scale INTEGER,
                    scenery_scale INTEGER,
                    estimated_hours REAL,
                    description TEXT,
                    status TEXT NOT NULL DEFAULT 'unknown',
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_trails_mountain_id ON trails(mountain_id)",
                "CREATE TABLE points_of_interest (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    trail_id INTEGER REFERENCES trails(id) ON DELETE SET NULL,
                    name TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    latitude REAL,
                    longitude REAL,
                    description TEXT,
                    water_available INTEGER NOT NULL DEFAULT 0,
                    tent_capacity INTEGER
                )",
                "CREATE INDEX idx_poi_trail_id ON points_of_interest(trail_id)",
                "CREATE TABLE articles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    slug TEXT UNIQUE NOT NULL,
                    body TEXT NOT NULL,
                    author_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    status TEXT NOT NULL DEFAULT 'draft',
                    category TEXT,
                    cover_image_url TEXT,
                    published_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_articles_status ON articles(status)",
                "CREATE TABLE tags (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL COLLATE NOCASE
                )",
                "CREATE TABLE article_tags (
                    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                    PRIMARY KEY (article_id, tag_id)
                )",
                "CREATE INDEX idx_article_tags_tag_id ON article_tags(tag_id)",
                "CREATE TABLE gallery_photos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    mountain_id INTEGER REFERENCES mountains(id) ON DELETE SET NULL,
                    photo_path TEXT NOT NULL,
                    photo_mimetype TEXT NOT NULL,
                    photo_size INTEGER NOT NULL,
                    author_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE announcements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    body TEXT NOT NULL,
                    mountain_id INTEGER REFERENCES mountains(id) ON DELETE SET NULL,
                    trail_id INTEGER REFERENCES trails(id) ON DELETE SET NULL,
                    valid_from TEXT,
                    valid_until TEXT,
                    status TEXT NOT NULL DEFAULT 'draft',
                    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    trail_id INTEGER NOT NULL REFERENCES trails(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    rating INTEGER NOT NULL,
                    comment TEXT,
                    status TEXT NOT NULL DEFAULT 'pending',
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_reviews_trail_id ON reviews(trail_id)",
                "CREATE TABLE bug_reports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    reporter_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    page TEXT,
                    screenshot_path TEXT,
                    status TEXT NOT NULL DEFAULT 'new',
                    priority TEXT,
                    admin_note TEXT,
                    reported_at TEXT NOT NULL DEFAULT (datetime('now')),
                    resolved_at TEXT
                )",
            ],
        )
        .await
    }

    async fn migrate_v2(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            2,
            &[
                // Ordering and filtering used by the public listings
                "CREATE INDEX idx_announcements_status ON announcements(status, valid_from, valid_until)",
                "CREATE INDEX idx_bug_reports_status ON bug_reports(status, reported_at)",
            ],
        )
        .await
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get the anti-forgery session store.
    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.pool.clone())
    }

    pub fn mountains(&self) -> MountainStore {
        MountainStore::new(self.pool.clone())
    }

    pub fn trails(&self) -> TrailStore {
        TrailStore::new(self.pool.clone())
    }

    /// Get the points of interest store.
    pub fn pois(&self) -> PoiStore {
        PoiStore::new(self.pool.clone())
    }

    pub fn articles(&self) -> ArticleStore {
        ArticleStore::new(self.pool.clone())
    }

    pub fn tags(&self) -> TagStore {
        TagStore::new(self.pool.clone())
    }

    pub fn galleries(&self) -> GalleryStore {
        GalleryStore::new(self.pool.clone())
    }

    pub fn announcements(&self) -> AnnouncementStore {
        AnnouncementStore::new(self.pool.clone())
    }

    pub fn reviews(&self) -> ReviewStore {
        ReviewStore::new(self.pool.clone())
    }

    pub fn bug_reports(&self) -> BugReportStore {
        BugReportStore::new(self.pool.clone())
    }

    /// Get the admin dashboard statistics store.
    pub fn stats(&self) -> StatsStore {
        StatsStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
