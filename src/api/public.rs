//! Public read endpoints plus the two user submissions (reviews and bug reports).

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ConstraintExt, ResultExt, optional_text, require_text};
use crate::auth::Auth;
use crate::db::{
    Database, Mountain, NewBugReport, PointOfInterest, ReviewSummary, Trail, TrailSummary,
};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::uploads::StoredFile;

/// Number of announcements returned by `/latest`.
const LATEST_ANNOUNCEMENTS: i64 = 3;

#[derive(Clone)]
pub struct PublicState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(PublicState);

pub fn router(state: PublicState) -> Router {
    Router::new()
        .route("/mountains", get(list_mountains))
        .route("/mountains/{id}", get(get_mountain))
        .route("/mountains/{id}/trails", get(list_mountain_trails))
        .route("/trails", get(list_trails))
        .route("/trails/{id}", get(get_trail))
        .route("/trails/{id}/reviews", post(submit_review))
        .route("/public/announcements", get(list_announcements))
        .route("/public/announcements/latest", get(latest_announcements))
        .route("/public/announcements/{id}", get(get_announcement))
        .route("/public/articles", get(list_articles))
        .route("/public/articles/{slug}", get(get_article))
        .route("/bug-reports", post(submit_bug_report))
        .with_state(state)
}

#[derive(Serialize)]
struct MountainDetail {
    #[serde(flatten)]
    mountain: Mountain,
    trails: Vec<TrailSummary>,
}

#[derive(Serialize)]
struct TrailDetail {
    #[serde(flatten)]
    trail: Trail,
    points_of_interest: Vec<PointOfInterest>,
    reviews: Vec<ReviewSummary>,
}

#[derive(Deserialize)]
struct ReviewRequest {
    rating: Option<i64>,
    comment: Option<String>,
}

#[derive(Deserialize)]
struct BugReportRequest {
    title: Option<String>,
    description: Option<String>,
    page: Option<String>,
    screenshot: Option<StoredFile>,
}

// --- Mountains and trails ---

async fn list_mountains(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let mountains = state
        .db
        .mountains()
        .list_summaries()
        .await
        .db_err("Failed to list mountains")?;
    Ok(Json(mountains))
}

async fn get_mountain(
    State(state): State<PublicState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let mountain = state
        .db
        .mountains()
        .get(id)
        .await
        .db_err("Failed to load mountain")?
        .ok_or_else(|| ApiError::not_found("Mountain not found"))?;
    let trails = state
        .db
        .trails()
        .list_for_mountain(id)
        .await
        .db_err("Failed to list trails")?;

    Ok(Json(MountainDetail { mountain, trails }))
}

async fn list_mountain_trails(
    State(state): State<PublicState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .mountains()
        .get(id)
        .await
        .db_err("Failed to load mountain")?
        .ok_or_else(|| ApiError::not_found("Mountain not found"))?;
    let trails = state
        .db
        .trails()
        .list_for_mountain(id)
        .await
        .db_err("Failed to list trails")?;
    Ok(Json(trails))
}

async fn list_trails(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let trails = state.db.trails().list().await.db_err("Failed to list trails")?;
    Ok(Json(trails))
}

async fn get_trail(
    State(state): State<PublicState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let trail = state
        .db
        .trails()
        .get(id)
        .await
        .db_err("Failed to load trail")?
        .ok_or_else(|| ApiError::not_found("Trail not found"))?;
    let points_of_interest = state
        .db
        .pois()
        .list_for_trail(id)
        .await
        .db_err("Failed to list points of interest")?;
    let reviews = state
        .db
        .reviews()
        .list_approved_for_trail(id)
        .await
        .db_err("Failed to list reviews")?;

    Ok(Json(TrailDetail {
        trail,
        points_of_interest,
        reviews,
    }))
}

async fn submit_review(
    State(state): State<PublicState>,
    auth: Auth,
    Path(trail_id): Path<i64>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = match payload.rating {
        Some(r) if (1..=5).contains(&r) => r,
        _ => return Err(ApiError::bad_request("Rating must be between 1 and 5")),
    };
    let comment = optional_text(payload.comment.as_deref());

    let id = state
        .db
        .reviews()
        .create(trail_id, auth.user.user_id(), rating, comment.as_deref())
        .await
        .map_err(|e| {
            if super::error::is_foreign_key_violation(&e) {
                ApiError::not_found("Trail not found")
            } else {
                ApiError::db_error("Failed to save review", e)
            }
        })?;

    info!(review_id = id, trail_id, user_id = auth.user.user_id(), "Review submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Review submitted and awaiting moderation",
            "id": id,
        })),
    ))
}

// --- Announcements ---

async fn list_announcements(
    State(state): State<PublicState>,
) -> Result<impl IntoResponse, ApiError> {
    let announcements = state
        .db
        .announcements()
        .list_current(None)
        .await
        .db_err("Failed to list announcements")?;
    Ok(Json(announcements))
}

async fn latest_announcements(
    State(state): State<PublicState>,
) -> Result<impl IntoResponse, ApiError> {
    let announcements = state
        .db
        .announcements()
        .list_current(Some(LATEST_ANNOUNCEMENTS))
        .await
        .db_err("Failed to list announcements")?;
    Ok(Json(announcements))
}

async fn get_announcement(
    State(state): State<PublicState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let announcement = state
        .db
        .announcements()
        .get_current(id)
        .await
        .db_err("Failed to load announcement")?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    Ok(Json(announcement))
}

// --- Articles ---

async fn list_articles(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let articles = state
        .db
        .articles()
        .list_published()
        .await
        .db_err("Failed to list articles")?;
    Ok(Json(articles))
}

async fn get_article(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .db
        .articles()
        .get_published_by_slug(&slug)
        .await
        .db_err("Failed to load article")?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(article))
}

// --- Bug reports ---

async fn submit_bug_report(
    State(state): State<PublicState>,
    auth: Auth,
    Json(payload): Json<BugReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = require_text(payload.title.as_deref(), "Title")?;
    let description = require_text(payload.description.as_deref(), "Description")?;
    let page = optional_text(payload.page.as_deref());
    if let Some(screenshot) = &payload.screenshot {
        screenshot.validate_image()?;
    }

    let id = state
        .db
        .bug_reports()
        .create(&NewBugReport {
            reporter_id: auth.user.user_id(),
            title: &title,
            description: &description,
            page: page.as_deref(),
            screenshot_path: payload.screenshot.as_ref().map(|s| s.path.as_str()),
        })
        .await
        .write_err(
            "Failed to save bug report",
            "Bug report already exists",
            "Reporter account no longer exists",
        )?;

    info!(bug_report_id = id, user_id = auth.user.user_id(), "Bug report submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Bug report submitted", "id": id })),
    ))
}
