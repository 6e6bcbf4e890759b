//! Origin allow-list gate. Runs first on every request, authenticated or not.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use crate::cli::RunMode;

/// Origins accepted when none are configured.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
];

/// Immutable allow-list built once at startup.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    mode: RunMode,
}

/// Outcome of checking a request against the policy.
#[derive(Debug, PartialEq, Eq)]
pub enum OriginDecision {
    Allow,
    /// Listed origin is not allowed.
    Deny(String),
    /// No `Origin`, but the browser marked the request as cross-site.
    DenyCrossSite,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, mode: RunMode) -> Self {
        Self { allowed, mode }
    }

    pub fn check(&self, headers: &HeaderMap) -> OriginDecision {
        match headers.get("origin") {
            Some(origin) => {
                let origin = origin.to_str().unwrap_or_default();
                if self.allowed.iter().any(|allowed| allowed == origin) {
                    OriginDecision::Allow
                } else {
                    OriginDecision::Deny(origin.to_string())
                }
            }
            None if self.mode != RunMode::Production => OriginDecision::Allow,
            None => {
                let cross_site = headers
                    .get("sec-fetch-site")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.eq_ignore_ascii_case("cross-site"));
                if cross_site {
                    OriginDecision::DenyCrossSite
                } else {
                    OriginDecision::Allow
                }
            }
        }
    }
}

#[derive(Serialize)]
struct OriginDeniedResponse {
    message: &'static str,
}

/// Reject requests from origins outside the allow-list with a generic 403.
pub async fn origin_gate(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    match policy.check(request.headers()) {
        OriginDecision::Allow => next.run(request).await,
        decision => {
            match &decision {
                OriginDecision::Deny(origin) => warn!(
                    stage = "origin",
                    origin = %origin,
                    path = %request.uri().path(),
                    "Request rejected"
                ),
                _ => warn!(
                    stage = "origin",
                    reason = "cross-site request without origin",
                    path = %request.uri().path(),
                    "Request rejected"
                ),
            }
            (
                StatusCode::FORBIDDEN,
                Json(OriginDeniedResponse {
                    message: "Origin not permitted",
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(mode: RunMode) -> OriginPolicy {
        OriginPolicy::new(
            DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            mode,
        )
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_listed_origin_allowed() {
        let policy = policy(RunMode::Production);
        assert_eq!(
            policy.check(&headers(&[("origin", "http://localhost:3000")])),
            OriginDecision::Allow
        );
    }

    #[test]
    fn test_unlisted_origin_denied_in_every_mode() {
        for mode in [RunMode::Development, RunMode::Test, RunMode::Production] {
            assert_eq!(
                policy(mode).check(&headers(&[("origin", "http://evil.com")])),
                OriginDecision::Deny("http://evil.com".to_string())
            );
        }
    }

    #[test]
    fn test_origin_match_is_exact() {
        let policy = policy(RunMode::Development);
        assert!(matches!(
            policy.check(&headers(&[("origin", "http://localhost:3000/")])),
            OriginDecision::Deny(_)
        ));
        assert!(matches!(
            policy.check(&headers(&[("origin", "https://localhost:3000")])),
            OriginDecision::Deny(_)
        ));
    }

    #[test]
    fn test_missing_origin() {
        let cross_site = headers(&[("sec-fetch-site", "cross-site")]);
        let same_origin = headers(&[("sec-fetch-site", "same-origin")]);

        assert_eq!(
            policy(RunMode::Development).check(&cross_site),
            OriginDecision::Allow
        );
        assert_eq!(policy(RunMode::Test).check(&HeaderMap::new()), OriginDecision::Allow);

        let production = policy(RunMode::Production);
        assert_eq!(production.check(&HeaderMap::new()), OriginDecision::Allow);
        assert_eq!(production.check(&same_origin), OriginDecision::Allow);
        assert_eq!(production.check(&cross_site), OriginDecision::DenyCrossSite);
    }
}
