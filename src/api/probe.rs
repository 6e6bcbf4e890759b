//! `/api/protected-route`: exercises the bearer and anti-forgery gates
//! without touching any data.

use axum::{
    Json, Router,
    http::Method,
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{AnyRole, Auth, require_role};
use crate::csrf::{SessionManager, csrf_guard};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct ProbeState {
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(ProbeState);

pub fn router(state: ProbeState, sessions: SessionManager) -> Router {
    Router::new()
        .route(
            "/protected-route",
            get(probe).post(probe).put(probe).delete(probe),
        )
        .route_layer(middleware::from_fn_with_state(sessions, csrf_guard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_role::<ProbeState, AnyRole>,
        ))
        .with_state(state)
}

async fn probe(method: Method, auth: Auth) -> impl IntoResponse {
    debug!(method = %method, user_id = auth.user.user_id(), "Protected route reached");
    Json(json!({ "success": true, "user": auth.user.identity() }))
}
