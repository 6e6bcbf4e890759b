//! Liveness endpoint and the catch-all 404.

use std::time::Instant;

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub started_at: Instant,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_secs: u64,
}

/// `GET /health` and `GET /api/health`.
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct NotFoundResponse {
    message: &'static str,
    path: String,
}

/// Fallback for unknown routes.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            message: "Endpoint not found",
            path: uri.path().to_string(),
        }),
    )
}
