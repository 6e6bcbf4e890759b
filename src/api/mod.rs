mod admin;
mod auth;
mod chatbot;
mod error;
mod health;
mod probe;
mod profile;
mod public;
mod recommendations;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Instant;

use crate::chatbot::ChatbotClient;
use crate::csrf::{SessionManager, csrf_token};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::notify::PasswordResetNotifier;
use crate::rate_limit::RateLimitConfig;
use crate::recommend::Recommender;

pub use error::{
    ApiError, ConstraintExt, ErrorDetail, ResultExt, expose_error_detail, is_foreign_key_violation,
    is_unique_violation,
};
pub use health::{HealthState, health, not_found};

/// Everything the API routers are built from.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionManager,
    pub rate_limits: Arc<RateLimitConfig>,
    pub recommender: Recommender,
    pub chatbot: Option<ChatbotClient>,
    pub frontend_url: Arc<str>,
    pub reset_notifier: Arc<dyn PasswordResetNotifier>,
    pub started_at: Instant,
}

/// Create the API router, mounted under `/api`.
pub fn create_api_router(ctx: ApiContext) -> Router {
    let auth_state = auth::AuthState {
        db: ctx.db.clone(),
        jwt: ctx.jwt.clone(),
        sessions: ctx.sessions.clone(),
        frontend_url: ctx.frontend_url.clone(),
        reset_notifier: ctx.reset_notifier.clone(),
    };

    let profile_state = profile::ProfileState {
        db: ctx.db.clone(),
        jwt: ctx.jwt.clone(),
    };

    let admin_state = admin::AdminState {
        db: ctx.db.clone(),
        jwt: ctx.jwt.clone(),
    };

    let public_state = public::PublicState {
        db: ctx.db.clone(),
        jwt: ctx.jwt.clone(),
    };

    let probe_state = probe::ProbeState {
        jwt: ctx.jwt.clone(),
    };

    let recommendations_state = recommendations::RecommendationsState {
        recommender: ctx.recommender.clone(),
    };

    let chatbot_state = chatbot::ChatbotState {
        client: ctx.chatbot.clone(),
        recommender: ctx.recommender.clone(),
    };

    let health_state = HealthState {
        started_at: ctx.started_at,
    };

    Router::new()
        .route("/health", get(health).with_state(health_state))
        .route("/csrf-token", get(csrf_token).with_state(ctx.sessions.clone()))
        .nest("/auth", auth::router(auth_state, ctx.rate_limits.clone()))
        .nest("/profile", profile::router(profile_state))
        .nest("/admin", admin::router(admin_state, ctx.sessions.clone()))
        .nest(
            "/recommendations",
            recommendations::router(recommendations_state),
        )
        .nest("/chatbot", chatbot::router(chatbot_state))
        .merge(probe::router(probe_state, ctx.sessions))
        .merge(public::router(public_state))
}
