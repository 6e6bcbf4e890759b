//! Articles, tags, gallery photos and announcements.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::{AdminState, created, message, not_found_unless, one_of_or};
use crate::api::error::{ApiError, ConstraintExt, ResultExt, optional_text, require_text};
use crate::auth::{AdminOnly, Auth};
use crate::db::{AnnouncementInput, ArticleInput, NewGalleryPhoto, slugify};
use crate::uploads::StoredFile;

const ARTICLE_STATUSES: &[&str] = &["draft", "published"];
const ANNOUNCEMENT_STATUSES: &[&str] = &["draft", "published", "archived"];

pub(super) fn routes() -> Router<AdminState> {
    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route(
            "/articles/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", axum::routing::put(rename_tag).delete(delete_tag))
        .route("/galleries", get(list_photos).post(create_photo))
        .route("/galleries/{id}", delete(delete_photo))
        .route(
            "/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route(
            "/announcements/{id}",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
}

// --- Articles ---

#[derive(Deserialize)]
struct ArticleRequest {
    title: Option<String>,
    body: Option<String>,
    status: Option<String>,
    category: Option<String>,
    cover_image_url: Option<String>,
    tag_ids: Option<Vec<i64>>,
}

impl ArticleRequest {
    fn into_input(self) -> Result<ArticleInput, ApiError> {
        let title = require_text(self.title.as_deref(), "Title")?;
        let body = require_text(self.body.as_deref(), "Body")?;
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(ApiError::bad_request(
                "Title must contain at least one letter or digit",
            ));
        }
        let mut tag_ids = self.tag_ids;
        if let Some(ids) = tag_ids.as_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        Ok(ArticleInput {
            title,
            slug,
            body,
            status: one_of_or(self.status.as_deref(), "draft", ARTICLE_STATUSES, "status")?,
            category: optional_text(self.category.as_deref()),
            cover_image_url: optional_text(self.cover_image_url.as_deref()),
            tag_ids,
        })
    }
}

async fn list_articles(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let articles = state
        .db
        .articles()
        .list()
        .await
        .db_err("Failed to list articles")?;
    Ok(Json(articles))
}

async fn get_article(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .db
        .articles()
        .get(id)
        .await
        .db_err("Failed to load article")?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(article))
}

async fn create_article(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Json(payload): Json<ArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let id = state
        .db
        .articles()
        .create(auth.user.user_id(), &input)
        .await
        .write_err(
            "Failed to create article",
            "An article with this title already exists",
            "Unknown tag",
        )?;
    info!(article_id = id, slug = %input.slug, status = %input.status, "Article created");
    Ok(created("Article created", id))
}

async fn update_article(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<ArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let updated = state.db.articles().update(id, &input).await.write_err(
        "Failed to update article",
        "An article with this title already exists",
        "Unknown tag",
    )?;
    not_found_unless(updated, "Article")?;
    Ok(message("Article updated"))
}

async fn delete_article(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .articles()
        .delete(id)
        .await
        .db_err("Failed to delete article")?;
    not_found_unless(deleted, "Article")?;
    Ok(message("Article deleted"))
}

// --- Tags ---

#[derive(Deserialize)]
struct TagRequest {
    name: Option<String>,
}

async fn list_tags(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let tags = state
        .db
        .tags()
        .list_with_counts()
        .await
        .db_err("Failed to list tags")?;
    Ok(Json(tags))
}

async fn create_tag(
    State(state): State<AdminState>,
    Json(payload): Json<TagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = require_text(payload.name.as_deref(), "Tag name")?;
    let id = state.db.tags().create(&name).await.write_err(
        "Failed to create tag",
        "Tag already exists",
        "Tag already exists",
    )?;
    Ok(created("Tag created", id))
}

async fn rename_tag(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<TagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = require_text(payload.name.as_deref(), "Tag name")?;
    let updated = state.db.tags().rename(id, &name).await.write_err(
        "Failed to rename tag",
        "Tag already exists",
        "Tag already exists",
    )?;
    not_found_unless(updated, "Tag")?;
    Ok(message("Tag updated"))
}

async fn delete_tag(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .tags()
        .delete(id)
        .await
        .db_err("Failed to delete tag")?;
    not_found_unless(deleted, "Tag")?;
    Ok(message("Tag deleted"))
}

// --- Gallery ---

#[derive(Deserialize)]
struct PhotoRequest {
    title: Option<String>,
    description: Option<String>,
    mountain_id: Option<i64>,
    photo: Option<StoredFile>,
}

async fn list_photos(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let photos = state
        .db
        .galleries()
        .list()
        .await
        .db_err("Failed to list gallery")?;
    Ok(Json(photos))
}

async fn create_photo(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Json(payload): Json<PhotoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = require_text(payload.title.as_deref(), "Title")?;
    let photo = payload
        .photo
        .ok_or_else(|| ApiError::bad_request("Photo file is required"))?;
    photo.validate_image()?;
    let description = optional_text(payload.description.as_deref());

    let id = state
        .db
        .galleries()
        .create(&NewGalleryPhoto {
            title: &title,
            description: description.as_deref(),
            mountain_id: payload.mountain_id,
            photo_path: &photo.path,
            photo_mimetype: &photo.mimetype,
            photo_size: photo.size,
            author_id: auth.user.user_id(),
        })
        .await
        .write_err(
            "Failed to save photo",
            "Photo already exists",
            "Mountain does not exist",
        )?;
    Ok(created("Photo uploaded", id))
}

async fn delete_photo(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .galleries()
        .delete(id)
        .await
        .db_err("Failed to delete photo")?;
    not_found_unless(deleted, "Photo")?;
    Ok(message("Photo deleted"))
}

// --- Announcements ---

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<String>, ApiError> {
    match optional_text(value) {
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(|date| Some(date.format("%Y-%m-%d").to_string()))
            .map_err(|_| ApiError::bad_request(format!("{} must be a date (YYYY-MM-DD)", field))),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
struct AnnouncementRequest {
    title: Option<String>,
    body: Option<String>,
    mountain_id: Option<i64>,
    trail_id: Option<i64>,
    valid_from: Option<String>,
    valid_until: Option<String>,
    status: Option<String>,
}

impl AnnouncementRequest {
    fn into_input(self) -> Result<AnnouncementInput, ApiError> {
        let title = require_text(self.title.as_deref(), "Title")?;
        let body = require_text(self.body.as_deref(), "Body")?;
        let valid_from = parse_date(self.valid_from.as_deref(), "valid_from")?;
        let valid_until = parse_date(self.valid_until.as_deref(), "valid_until")?;
        if let (Some(from), Some(until)) = (&valid_from, &valid_until) {
            // ISO dates order lexicographically.
            if from > until {
                return Err(ApiError::bad_request(
                    "valid_from must not be after valid_until",
                ));
            }
        }
        Ok(AnnouncementInput {
            title,
            body,
            mountain_id: self.mountain_id,
            trail_id: self.trail_id,
            valid_from,
            valid_until,
            status: one_of_or(
                self.status.as_deref(),
                "draft",
                ANNOUNCEMENT_STATUSES,
                "status",
            )?,
        })
    }
}

async fn list_announcements(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    let announcements = state
        .db
        .announcements()
        .list()
        .await
        .db_err("Failed to list announcements")?;
    Ok(Json(announcements))
}

async fn get_announcement(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let announcement = state
        .db
        .announcements()
        .get(id)
        .await
        .db_err("Failed to load announcement")?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    Ok(Json(announcement))
}

async fn create_announcement(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Json(payload): Json<AnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let id = state
        .db
        .announcements()
        .create(auth.user.user_id(), &input)
        .await
        .write_err(
            "Failed to create announcement",
            "Announcement already exists",
            "Mountain or trail does not exist",
        )?;
    Ok(created("Announcement created", id))
}

async fn update_announcement(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<AnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let updated = state.db.announcements().update(id, &input).await.write_err(
        "Failed to update announcement",
        "Announcement already exists",
        "Mountain or trail does not exist",
    )?;
    not_found_unless(updated, "Announcement")?;
    Ok(message("Announcement updated"))
}

async fn delete_announcement(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .announcements()
        .delete(id)
        .await
        .db_err("Failed to delete announcement")?;
    not_found_unless(deleted, "Announcement")?;
    Ok(message("Announcement deleted"))
}
