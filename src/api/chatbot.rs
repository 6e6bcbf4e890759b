//! Chatbot proxy and fulfillment webhook.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::error::{ApiError, require_text};
use crate::chatbot::{ChatbotClient, translate_parameters, webhook_failure, webhook_response};
use crate::recommend::{RecommendationKind, Recommender};

#[derive(Clone)]
pub struct ChatbotState {
    /// `None` when no intent-detection endpoint is configured.
    pub client: Option<ChatbotClient>,
    pub recommender: Recommender,
}

pub fn router(state: ChatbotState) -> Router {
    Router::new()
        .route("/detect-intent", post(detect_intent))
        .route("/webhook", post(webhook))
        .with_state(state)
}

#[derive(Deserialize)]
struct DetectIntentRequest {
    text: Option<String>,
    session_id: Option<String>,
}

async fn detect_intent(
    State(state): State<ChatbotState>,
    Json(payload): Json<DetectIntentRequest>,
) -> Result<Response, ApiError> {
    let text = require_text(payload.text.as_deref(), "Text")?;
    let session_id = require_text(payload.session_id.as_deref(), "Session id")?;

    let Some(client) = &state.client else {
        warn!("Chatbot request received but no endpoint is configured");
        return Err(ApiError::internal("Chatbot is not configured"));
    };

    let fulfillment = client
        .detect_intent(&text, &session_id)
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to contact chatbot", e))?;

    Ok(Json(fulfillment).into_response())
}

async fn webhook(State(state): State<ChatbotState>, Json(body): Json<Value>) -> Response {
    let params = body
        .pointer("/queryResult/parameters")
        .cloned()
        .unwrap_or(Value::Null);
    let filters = translate_parameters(&params);
    info!(filters = %filters, "Chatbot webhook received");

    let reply = match state
        .recommender
        .recommend(&filters, RecommendationKind::Mountains)
        .await
    {
        Ok(result) => webhook_response(&result.items),
        Err(e) => {
            error!(error = %e, "Chatbot webhook failed to compute recommendations");
            webhook_failure()
        }
    };

    (StatusCode::OK, Json(reply)).into_response()
}
