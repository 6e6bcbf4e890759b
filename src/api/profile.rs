//! The signed-in user's own profile.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::auth::{check_password, hash_password, is_valid_email, user_write_error, verify_password};
use super::error::{ApiError, ResultExt, optional_text, require_text};
use crate::auth::Auth;
use crate::db::{Database, ProfileUpdate};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::uploads::StoredFile;

#[derive(Clone)]
pub struct ProfileState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(ProfileState);

pub fn router(state: ProfileState) -> Router {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/password", put(change_password))
        .route("/avatar", put(update_avatar))
        .with_state(state)
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    domicile: Option<String>,
    institution: Option<String>,
    phone: Option<String>,
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

#[derive(Deserialize)]
struct AvatarRequest {
    avatar: Option<StoredFile>,
}

async fn get_profile(
    State(state): State<ProfileState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .db
        .users()
        .get_profile(auth.user.user_id())
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<ProfileState>,
    auth: Auth,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = require_text(payload.full_name.as_deref(), "Full name")?;
    let username = require_text(payload.username.as_deref(), "Username")?;
    let email = require_text(payload.email.as_deref(), "Email")?;
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    let domicile = optional_text(payload.domicile.as_deref());
    let institution = optional_text(payload.institution.as_deref());
    let phone = optional_text(payload.phone.as_deref());

    let user_id = auth.user.user_id();
    let updated = state
        .db
        .users()
        .update_profile(
            user_id,
            &ProfileUpdate {
                full_name: &full_name,
                username: &username,
                email: &email,
                domicile: domicile.as_deref(),
                institution: institution.as_deref(),
                phone: phone.as_deref(),
            },
        )
        .await
        .map_err(|e| user_write_error("Failed to update profile", e))?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    let profile = state
        .db
        .users()
        .get_profile(user_id)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "message": "Profile updated", "user": profile })))
}

async fn change_password(
    State(state): State<ProfileState>,
    auth: Auth,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(current), Some(new_password)) = (
        payload.current_password.filter(|p| !p.is_empty()),
        payload.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "Current and new password are required",
        ));
    };
    check_password(&new_password)?;

    let user_id = auth.user.user_id();
    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(&current, Some(&user.password_hash)).await? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = hash_password(&new_password).await?;
    state
        .db
        .users()
        .set_password_hash(user_id, &hash)
        .await
        .db_err("Failed to update password")?;

    info!(user_id, "Password changed");
    Ok(Json(json!({ "message": "Password updated" })))
}

async fn update_avatar(
    State(state): State<ProfileState>,
    auth: Auth,
    Json(payload): Json<AvatarRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let avatar = payload
        .avatar
        .ok_or_else(|| ApiError::bad_request("Avatar file is required"))?;
    avatar.validate_image()?;

    let updated = state
        .db
        .users()
        .set_avatar(auth.user.user_id(), &avatar.path)
        .await
        .db_err("Failed to update avatar")?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(json!({ "message": "Avatar updated", "avatar_url": avatar.path })))
}
