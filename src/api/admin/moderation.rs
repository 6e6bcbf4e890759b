//! Review moderation and bug report triage.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, patch, put},
};
use serde::Deserialize;
use tracing::info;

use super::{AdminState, message, not_found_unless, one_of};
use crate::api::error::{ApiError, ResultExt, optional_text, require_text};
use crate::auth::{AdminOnly, Auth};

const REVIEW_DECISIONS: &[&str] = &["approved", "rejected"];
const BUG_STATUSES: &[&str] = &["new", "in_review", "resolved", "closed"];
const BUG_PRIORITIES: &[&str] = &["low", "medium", "high"];

pub(super) fn routes() -> Router<AdminState> {
    Router::new()
        .route("/reviews", get(list_reviews))
        .route("/reviews/{id}", delete(delete_review))
        .route("/reviews/{id}/status", patch(moderate_review))
        .route("/bug-reports", get(list_bug_reports))
        .route(
            "/bug-reports/{id}",
            put(update_bug_report).delete(delete_bug_report),
        )
}

// --- Reviews ---

#[derive(Deserialize)]
struct ModerateRequest {
    status: Option<String>,
}

async fn list_reviews(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let reviews = state
        .db
        .reviews()
        .list()
        .await
        .db_err("Failed to list reviews")?;
    Ok(Json(reviews))
}

async fn moderate_review(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Path(id): Path<i64>,
    Json(payload): Json<ModerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = require_text(payload.status.as_deref(), "Status")?;
    let status = one_of(&status, REVIEW_DECISIONS, "status")?;

    let updated = state
        .db
        .reviews()
        .set_status(id, &status)
        .await
        .db_err("Failed to update review")?;
    not_found_unless(updated, "Review")?;

    info!(admin_id = auth.user.user_id(), review_id = id, status = %status, "Review moderated");
    Ok(message("Review status updated"))
}

async fn delete_review(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .reviews()
        .delete(id)
        .await
        .db_err("Failed to delete review")?;
    not_found_unless(deleted, "Review")?;
    Ok(message("Review deleted"))
}

// --- Bug reports ---

#[derive(Deserialize)]
struct BugReportUpdate {
    status: Option<String>,
    priority: Option<String>,
    admin_note: Option<String>,
}

async fn list_bug_reports(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let reports = state
        .db
        .bug_reports()
        .list()
        .await
        .db_err("Failed to list bug reports")?;
    Ok(Json(reports))
}

async fn update_bug_report(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<BugReportUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let status = require_text(payload.status.as_deref(), "Status")?;
    let status = one_of(&status, BUG_STATUSES, "status")?;
    let priority = match optional_text(payload.priority.as_deref()) {
        Some(p) => Some(one_of(&p, BUG_PRIORITIES, "priority")?),
        None => None,
    };
    let admin_note = optional_text(payload.admin_note.as_deref());

    let updated = state
        .db
        .bug_reports()
        .update(id, &status, priority.as_deref(), admin_note.as_deref())
        .await
        .db_err("Failed to update bug report")?;
    not_found_unless(updated, "Bug report")?;
    Ok(message("Bug report updated"))
}

async fn delete_bug_report(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .bug_reports()
        .delete(id)
        .await
        .db_err("Failed to delete bug report")?;
    not_found_unless(deleted, "Bug report")?;
    Ok(message("Bug report deleted"))
}
