//! User management.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::info;

use super::{AdminState, created, message, not_found_unless};
use crate::api::auth::{check_password, hash_password, is_valid_email, user_write_error};
use crate::api::error::{ApiError, ResultExt, optional_text, require_text};
use crate::auth::{AdminOnly, Auth};
use crate::db::{NewUser, ProfileUpdate, UserRole, UserStatus};

pub(super) fn routes() -> Router<AdminState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/status", put(set_status))
}

fn parse_role(value: Option<&str>) -> Result<UserRole, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None | Some("user") => Ok(UserRole::User),
        Some("admin") => Ok(UserRole::Admin),
        Some("superadmin") => Ok(UserRole::Superadmin),
        Some(_) => Err(ApiError::bad_request(
            "role must be one of: user, admin, superadmin",
        )),
    }
}

fn parse_status(value: Option<&str>) -> Result<UserStatus, ApiError> {
    match value.map(str::trim) {
        Some("active") => Ok(UserStatus::Active),
        Some("inactive") => Ok(UserStatus::Inactive),
        Some("banned") => Ok(UserStatus::Banned),
        _ => Err(ApiError::bad_request(
            "status must be one of: active, inactive, banned",
        )),
    }
}

/// Only a superadmin may hand out the superadmin role.
fn check_grant(actor: UserRole, granted: UserRole) -> Result<(), ApiError> {
    if granted == UserRole::Superadmin && actor != UserRole::Superadmin {
        return Err(ApiError::forbidden(
            "Only a superadmin can assign the superadmin role",
        ));
    }
    Ok(())
}

/// Only a superadmin may modify a superadmin account.
fn check_target(actor: UserRole, target: UserRole) -> Result<(), ApiError> {
    if target == UserRole::Superadmin && actor != UserRole::Superadmin {
        return Err(ApiError::forbidden(
            "Only a superadmin can modify a superadmin account",
        ));
    }
    Ok(())
}

/// Load the target account and check the actor may modify it.
async fn load_target(state: &AdminState, actor: UserRole, id: i64) -> Result<(), ApiError> {
    let target = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    check_target(actor, target.role)
}

#[derive(Deserialize)]
struct CreateUserRequest {
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    domicile: Option<String>,
    institution: Option<String>,
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    domicile: Option<String>,
    institution: Option<String>,
    phone: Option<String>,
    role: Option<String>,
}

#[derive(Deserialize)]
struct StatusRequest {
    status: Option<String>,
}

async fn list_users(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_profile(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}

async fn create_user(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Json(payload): Json<CreateUserRequest>,
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

    let role = parse_role(payload.role.as_deref())?;
    check_grant(auth.user.claims.role, role)?;

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
            role,
            domicile: domicile.as_deref(),
            institution: institution.as_deref(),
        })
        .await
        .map_err(|e| user_write_error("Failed to create user", e))?;

    info!(admin_id = auth.user.user_id(), user_id = id, role = role.as_str(), "User created by admin");
    Ok(created("User created", id))
}

async fn update_user(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = require_text(payload.full_name.as_deref(), "Full name")?;
    let username = require_text(payload.username.as_deref(), "Username")?;
    let email = require_text(payload.email.as_deref(), "Email")?;
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    let role = match payload.role.as_deref() {
        Some(role) => {
            let role = parse_role(Some(role))?;
            check_grant(auth.user.claims.role, role)?;
            Some(role)
        }
        None => None,
    };
    load_target(&state, auth.user.claims.role, id).await?;

    let domicile = optional_text(payload.domicile.as_deref());
    let institution = optional_text(payload.institution.as_deref());
    let phone = optional_text(payload.phone.as_deref());

    let updated = state
        .db
        .users()
        .update_account(
            id,
            &ProfileUpdate {
                full_name: &full_name,
                username: &username,
                email: &email,
                domicile: domicile.as_deref(),
                institution: institution.as_deref(),
                phone: phone.as_deref(),
            },
            role,
        )
        .await
        .map_err(|e| user_write_error("Failed to update user", e))?;
    not_found_unless(updated, "User")?;

    Ok(message("User updated"))
}

async fn set_status(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = parse_status(payload.status.as_deref())?;
    if id == auth.user.user_id() && status != UserStatus::Active {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    load_target(&state, auth.user.claims.role, id).await?;

    let updated = state
        .db
        .users()
        .set_status(id, status)
        .await
        .db_err("Failed to update status")?;
    not_found_unless(updated, "User")?;

    info!(admin_id = auth.user.user_id(), user_id = id, status = status.as_str(), "User status changed");
    Ok(message("User status updated"))
}

async fn delete_user(
    State(state): State<AdminState>,
    auth: Auth<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if id == auth.user.user_id() {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    load_target(&state, auth.user.claims.role, id).await?;

    let deleted = state
        .db
        .users()
        .delete(id)
        .await
        .db_err("Failed to delete user")?;
    not_found_unless(deleted, "User")?;

    info!(admin_id = auth.user.user_id(), user_id = id, "User deleted");
    Ok(message("User deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), UserRole::User);
        assert_eq!(parse_role(Some("admin")).unwrap(), UserRole::Admin);
        assert!(parse_role(Some("root")).is_err());
    }

    #[test]
    fn test_only_superadmin_grants_superadmin() {
        assert!(check_grant(UserRole::Admin, UserRole::Admin).is_ok());
        assert!(check_grant(UserRole::Admin, UserRole::Superadmin).is_err());
        assert!(check_grant(UserRole::Superadmin, UserRole::Superadmin).is_ok());
    }

    #[test]
    fn test_only_superadmin_modifies_superadmin() {
        assert!(check_target(UserRole::Admin, UserRole::Admin).is_ok());
        assert!(check_target(UserRole::Admin, UserRole::Superadmin).is_err());
        assert!(check_target(UserRole::Superadmin, UserRole::Superadmin).is_ok());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(Some("banned")).unwrap(), UserStatus::Banned);
        assert!(parse_status(Some("deleted")).is_err());
        assert!(parse_status(None).is_err());
    }
}
