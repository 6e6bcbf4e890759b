//! Shared error handling for API endpoints.

use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::cli::RunMode;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    /// Log the error and turn it into a generic 500.
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
}

/// Constraint-aware mapping for persistence errors.
pub trait ConstraintExt<T> {
    /// Insert/update: unique violation → 409 `on_duplicate`, reference to a
    /// missing row → 400 `on_missing_ref`, anything else → 500.
    fn write_err(self, msg: &str, on_duplicate: &str, on_missing_ref: &str)
    -> Result<T, ApiError>;

    /// Delete: row still referenced → 409 `on_in_use`, anything else → 500.
    fn delete_err(self, msg: &str, on_in_use: &str) -> Result<T, ApiError>;
}

impl<T> ConstraintExt<T> for Result<T, sqlx::Error> {
    fn write_err(
        self,
        msg: &str,
        on_duplicate: &str,
        on_missing_ref: &str,
    ) -> Result<T, ApiError> {
        self.map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict(on_duplicate)
            } else if is_foreign_key_violation(&e) {
                ApiError::bad_request(on_missing_ref)
            } else {
                ApiError::db_error(msg, e)
            }
        })
    }

    fn delete_err(self, msg: &str, on_in_use: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::conflict(on_in_use)
            } else {
                ApiError::db_error(msg, e)
            }
        })
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// Message of a unique violation, which names the offending `table.column`.
pub fn unique_violation_message(e: &sqlx::Error) -> Option<String> {
    e.as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.message().to_string())
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    Internal { message: String, detail: String },
}

/// Internal error detail carried as a response extension.
/// Added to the body by [`expose_error_detail`] outside production.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let message = msg.into();
        Self::Internal {
            detail: message.clone(),
            message,
        }
    }

    pub fn internal_with_detail(msg: impl Into<String>, e: impl std::fmt::Display) -> Self {
        let message = msg.into();
        error!("{}: {}", message, e);
        Self::Internal {
            message,
            detail: e.to_string(),
        }
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal {
            message: "Database error".into(),
            detail: format!("{}: {}", context, e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal { message, detail } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, Some(detail))
            }
        };
        let mut response = (status, Json(ErrorResponse { error: message })).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

/// Largest error body rewritten by [`expose_error_detail`].
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Add internal error detail to JSON error bodies, except in production.
pub async fn expose_error_detail(
    State(mode): State<RunMode>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if mode == RunMode::Production {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, MAX_ERROR_BODY).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let mut value: serde_json::Value =
        serde_json::from_slice(&bytes).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(object) = value.as_object_mut() {
        object.insert("detail".to_string(), serde_json::Value::String(detail));
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(value.to_string()))
}

/// Parse a required, non-blank string field.
pub fn require_text(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}

/// Normalise an optional string: trimmed, with blanks treated as absent.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Check an optional integer scale against an inclusive range.
pub fn check_scale(
    value: Option<i64>,
    field: &str,
    min: i64,
    max: i64,
) -> Result<Option<i64>, ApiError> {
    match value {
        Some(v) if v < min || v > max => Err(ApiError::bad_request(format!(
            "{} must be between {} and {}",
            field, min, max
        ))),
        other => Ok(other),
    }
}
