//! Account endpoints: registration, login, logout and password reset.
//!
//! None of these require a bearer token or an anti-forgery token.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt, optional_text, require_text, unique_violation_message};
use crate::csrf::SessionManager;
use crate::db::{Database, NewUser, UserProfile, UserRole, UserStatus};
use crate::jwt::JwtConfig;
use crate::notify::PasswordResetNotifier;
use crate::password::{self, MIN_PASSWORD_LENGTH};
use crate::rate_limit::{
    RateLimitConfig, rate_limit_forgot_password, rate_limit_login, rate_limit_register,
};

/// Response to every forgot-password request, known email or not.
const RESET_REQUESTED_MESSAGE: &str =
    "If the email is registered, a password reset link has been sent.";

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionManager,
    pub frontend_url: Arc<str>,
    pub reset_notifier: Arc<dyn PasswordResetNotifier>,
}

pub fn router(state: AuthState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_login,
        ));

    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_register,
        ));

    let forgot_router = Router::new()
        .route("/forgot-password", post(forgot_password))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits,
            rate_limit_forgot_password,
        ));

    Router::new()
        .route("/logout", post(logout))
        .route("/reset-password", post(reset_password))
        .with_state(state)
        .merge(login_router)
        .merge(register_router)
        .merge(forgot_router)
}

// --- Helpers ---

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub(super) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub(super) fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub(super) async fn hash_password(password: &str) -> Result<String, ApiError> {
    password::hash_blocking(password.to_owned())
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to hash password", e))
}

/// Check a password off the async workers. `None` means no such account.
pub(super) async fn verify_password(password: &str, stored: Option<&str>) -> Result<bool, ApiError> {
    password::verify_blocking(password.to_owned(), stored.map(str::to_owned))
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to verify password", e))
}

/// Map a failed user insert/update: duplicate email or username → 409.
pub(super) fn user_write_error(context: &str, e: sqlx::Error) -> ApiError {
    match unique_violation_message(&e) {
        Some(msg) if msg.contains("users.email") => ApiError::conflict("Email is already registered"),
        Some(msg) if msg.contains("users.username") => ApiError::conflict("Username is already taken"),
        Some(_) => ApiError::conflict("User already exists"),
        None => ApiError::db_error(context, e),
    }
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct RegisterRequest {
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    domicile: Option<String>,
    institution: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    message: &'static str,
    user: UserProfile,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginUser {
    id: i64,
    full_name: String,
    username: String,
    email: String,
    role: UserRole,
    avatar_url: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    token: String,
    expires_at: u64,
    user: LoginUser,
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    email: Option<String>,
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    token: Option<String>,
    new_password: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

// --- Handlers ---

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = require_text(payload.full_name.as_deref(), "Full name")?;
    let username = require_text(payload.username.as_deref(), "Username")?;
    let email = require_text(payload.email.as_deref(), "Email")?;
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Password is required"))?;

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    check_password(&password)?;

    let password_hash = hash_password(&password).await?;
    let domicile = optional_text(payload.domicile.as_deref());
    let institution = optional_text(payload.institution.as_deref());

    let id = state
        .db
        .users()
        .create(&NewUser {
            full_name: &full_name,
            username: &username,
            email: &email,
            password_hash: &password_hash,
            role: UserRole::User,
            domicile: domicile.as_deref(),
            institution: institution.as_deref(),
        })
        .await
        .map_err(|e| user_write_error("Failed to create user", e))?;

    let user = state
        .db
        .users()
        .get_profile(id)
        .await
        .db_err("Failed to load new user")?
        .ok_or_else(|| ApiError::internal("User vanished after creation"))?;

    info!(user_id = id, username = %username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful",
            user,
        }),
    ))
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = require_text(payload.email.as_deref(), "Email")?;
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Password is required"))?;

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up user")?;

    let matched = verify_password(&password, user.as_ref().map(|u| u.password_hash.as_str())).await?;
    let Some(user) = user.filter(|_| matched) else {
        warn!(email = %email, "Failed login attempt");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    if user.status != UserStatus::Active {
        warn!(user_id = user.id, status = user.status.as_str(), "Login by inactive account");
        return Err(ApiError::forbidden("Account is not active"));
    }

    let token = state
        .jwt
        .generate_access_token(user.id, &user.email, user.role)
        .map_err(|e| ApiError::internal_with_detail("Failed to issue token", e))?;

    state
        .db
        .users()
        .touch_last_online(user.id)
        .await
        .db_err("Failed to update last online")?;

    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        token: token.token,
        expires_at: token.expires_at,
        user: LoginUser {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            email: user.email,
            role: user.role,
            avatar_url: user.avatar_url,
        },
    }))
}

/// Destroy the anti-forgery session. Bearer tokens stay valid until they expire.
async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let cookie = state
        .sessions
        .destroy(&headers)
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to end session", e))?;

    let mut response = Json(MessageResponse {
        message: "Logged out",
    })
    .into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

async fn forgot_password(
    State(state): State<AuthState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = require_text(payload.email.as_deref(), "Email")?;

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up user")?;

    if let Some(user) = user {
        let token = state
            .jwt
            .generate_reset_token(&user.email)
            .map_err(|e| ApiError::internal_with_detail("Failed to issue reset token", e))?;
        let link = format!(
            "{}/reset-password?token={}",
            state.frontend_url, token.token
        );
        state.reset_notifier.send_reset_link(&user.email, &link);
    }

    Ok(Json(MessageResponse {
        message: RESET_REQUESTED_MESSAGE,
    }))
}

async fn reset_password(
    State(state): State<AuthState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_text(payload.token.as_deref(), "Token")?;
    let new_password = payload
        .new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("New password is required"))?;
    check_password(&new_password)?;

    let invalid = || ApiError::bad_request("Invalid or expired reset token");
    let claims = state.jwt.validate_reset_token(&token).map_err(|_| invalid())?;

    let user = state
        .db
        .users()
        .get_by_email(&claims.email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(invalid)?;

    let hash = hash_password(&new_password).await?;
    state
        .db
        .users()
        .set_password_hash(user.id, &hash)
        .await
        .db_err("Failed to update password")?;

    info!(user_id = user.id, "Password reset");

    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}
