//! Proxy endpoints for the recommendation engine.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tracing::error;

use crate::recommend::{RecommendationKind, Recommender};

#[derive(Clone)]
pub struct RecommendationsState {
    pub recommender: Recommender,
}

pub fn router(state: RecommendationsState) -> Router {
    Router::new()
        .route("/mountains", post(recommend_mountains))
        .route("/trails", post(recommend_trails))
        .with_state(state)
}

async fn recommend_mountains(
    State(state): State<RecommendationsState>,
    Json(preferences): Json<Value>,
) -> Response {
    recommend(&state.recommender, &preferences, RecommendationKind::Mountains).await
}

async fn recommend_trails(
    State(state): State<RecommendationsState>,
    Json(preferences): Json<Value>,
) -> Response {
    recommend(&state.recommender, &preferences, RecommendationKind::Trails).await
}

async fn recommend(
    recommender: &Recommender,
    preferences: &Value,
    kind: RecommendationKind,
) -> Response {
    match recommender.recommend(preferences, kind).await {
        Ok(result) => Json(json!({
            "recommendations": result.items,
            "metadata": result.metadata,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, kind = ?kind, "Recommendation request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Failed to compute recommendations",
                    "recommendations": [],
                })),
            )
                .into_response()
        }
    }
}
