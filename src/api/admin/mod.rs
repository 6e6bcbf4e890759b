//! Admin API endpoints.
//!
//! Every route runs the bearer gate, then the admin role gate, then the
//! anti-forgery guard for state-changing methods.

mod content;
mod moderation;
mod places;
mod users;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, require_role};
use crate::csrf::{SessionManager, csrf_guard};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

/// Entries in the dashboard activity feed.
const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(AdminState);

pub fn router(state: AdminState, sessions: SessionManager) -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/stats/user-growth", get(user_growth))
        .route("/pending-items", get(pending_items))
        .route("/recent-activity", get(recent_activity))
        .merge(users::routes())
        .merge(places::routes())
        .merge(content::routes())
        .merge(moderation::routes())
        // Last added runs first: role gate, then anti-forgery.
        .route_layer(middleware::from_fn_with_state(sessions, csrf_guard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_role::<AdminState, AdminOnly>,
        ))
        .with_state(state)
}

/// 201 with the new row's id.
fn created(message: &'static str, id: i64) -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({ "message": message, "id": id })))
}

fn message(message: &'static str) -> Json<serde_json::Value> {
    Json(json!({ "message": message }))
}

/// Check a value against a fixed vocabulary.
fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<String, ApiError> {
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(ApiError::bad_request(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        )))
    }
}

/// Apply a default to an optional vocabulary value, then check it.
fn one_of_or(
    value: Option<&str>,
    default: &str,
    allowed: &[&str],
    field: &str,
) -> Result<String, ApiError> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default);
    one_of(value, allowed, field)
}

fn not_found_unless(found: bool, what: &str) -> Result<(), ApiError> {
    if found {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("{} not found", what)))
    }
}

async fn stats(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .db
        .stats()
        .dashboard()
        .await
        .db_err("Failed to load dashboard stats")?;

    Ok(Json(stats))
}

async fn user_growth(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let growth = state
        .db
        .stats()
        .user_growth()
        .await
        .db_err("Failed to load user growth")?;
    Ok(Json(growth))
}

async fn pending_items(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let pending = state
        .db
        .stats()
        .pending_items()
        .await
        .db_err("Failed to load pending items")?;
    Ok(Json(pending))
}

async fn recent_activity(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let events = state
        .db
        .stats()
        .recent_activity(RECENT_ACTIVITY_LIMIT)
        .await
        .db_err("Failed to load recent activity")?;
    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_of() {
        assert_eq!(one_of("open", &["open", "closed"], "status").unwrap(), "open");
        assert!(one_of("ajar", &["open", "closed"], "status").is_err());
        assert_eq!(
            one_of_or(None, "draft", &["draft", "published"], "status").unwrap(),
            "draft"
        );
        assert_eq!(
            one_of_or(Some(" "), "draft", &["draft", "published"], "status").unwrap(),
            "draft"
        );
        assert!(one_of_or(Some("live"), "draft", &["draft", "published"], "status").is_err());
    }
}
