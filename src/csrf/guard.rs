//! Request-level anti-forgery enforcement and the token bootstrap endpoint.

use axum::{
    Json,
    body::Body,
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use super::session::SessionManager;
use super::token;
use crate::api::ApiError;

/// Paths that never require an anti-forgery token.
pub const CSRF_EXEMPT_PATHS: &[&str] = &["/api/auth/login", "/api/auth/register", "/api/health"];

/// Largest body buffered while looking for a `_csrf` field.
const MAX_INSPECTED_BODY: usize = 1024 * 1024;

const TOKEN_FIELD: &str = "_csrf";

#[derive(Serialize)]
struct ForbiddenResponse {
    error: &'static str,
}

/// Every verification failure produces this same response.
fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ForbiddenResponse {
            error: "CSRF Forbidden",
        }),
    )
        .into_response()
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    ["x-csrf-token", "x-xsrf-token"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn token_from_form(bytes: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(bytes)
        .find(|(key, _)| key == TOKEN_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn token_from_body(headers: &HeaderMap, bytes: &[u8]) -> Option<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
        value.get(TOKEN_FIELD)?.as_str().map(str::to_string)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        token_from_form(bytes)
    } else {
        None
    }
}

/// Verify the anti-forgery token on state-changing requests.
///
/// Safe methods and [`CSRF_EXEMPT_PATHS`] pass through. Otherwise the token is
/// taken from the `X-CSRF-Token`/`X-XSRF-Token` header, then a `_csrf` field
/// in the JSON or form body, then a `_csrf` query parameter, and must derive
/// from the secret of the session named by the request cookie.
pub async fn csrf_guard(
    State(sessions): State<SessionManager>,
    request: Request,
    next: Next,
) -> Response {
    if !is_state_changing(request.method()) {
        return next.run(request).await;
    }

    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    if CSRF_EXEMPT_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let mut supplied = token_from_headers(request.headers());

    let request = if supplied.is_none() {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_INSPECTED_BODY).await {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!(stage = "csrf", path = %path, reason = "unreadable body", "Request rejected");
                return forbidden();
            }
        };
        supplied = token_from_body(&parts.headers, &bytes).or_else(|| {
            parts
                .uri
                .query()
                .and_then(|query| token_from_form(query.as_bytes()))
        });
        Request::from_parts(parts, Body::from(bytes))
    } else {
        request
    };

    let Some(supplied) = supplied else {
        warn!(stage = "csrf", path = %path, reason = "missing token", "Request rejected");
        return forbidden();
    };

    let session = match sessions.load(request.headers()).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to load session");
            return ApiError::internal_with_detail("Session store unavailable", e).into_response();
        }
    };

    let Some(session) = session else {
        warn!(stage = "csrf", path = %path, reason = "no session", "Request rejected");
        return forbidden();
    };

    if !token::verify(&session.csrf_secret, &supplied) {
        warn!(stage = "csrf", path = %path, reason = "token mismatch", "Request rejected");
        return forbidden();
    }

    next.run(request).await
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

/// `GET /api/csrf-token`: return the session token, establishing the session if needed.
pub async fn csrf_token(
    State(sessions): State<SessionManager>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (csrf_token, cookie) = sessions
        .issue_token(&headers)
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to get CSRF token", e))?;

    let mut response = Json(CsrfTokenResponse { csrf_token }).into_response();
    if let Some(cookie) = cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_headers_prefers_csrf_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-xsrf-token", HeaderValue::from_static("xsrf"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xsrf"));

        headers.insert("x-csrf-token", HeaderValue::from_static("csrf"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("csrf"));
    }

    #[test]
    fn test_token_from_body() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert_eq!(
            token_from_body(&headers, br#"{"_csrf":"abc","name":"x"}"#).as_deref(),
            Some("abc")
        );
        assert_eq!(token_from_body(&headers, br#"{"_csrf":42}"#), None);
        assert_eq!(token_from_body(&headers, b"not json"), None);

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert_eq!(
            token_from_body(&headers, b"name=x&_csrf=a%2Db").as_deref(),
            Some("a-b")
        );

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(token_from_body(&headers, b"_csrf=abc"), None);
    }

    #[test]
    fn test_state_changing_methods() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::PUT));
        assert!(is_state_changing(&Method::PATCH));
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::HEAD));
        assert!(!is_state_changing(&Method::OPTIONS));
    }
}
