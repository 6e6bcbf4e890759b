//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down brute force
//! attempts and signup spam.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Key used when the client address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const REGISTER_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();
const FORGOT_PASSWORD_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Login: bursts of 5, refilled at 1 per second.
    pub login: Arc<IpLimiter>,
    /// Registration: 3 per minute.
    pub register: Arc<IpLimiter>,
    /// Password reset requests: 3 per minute.
    pub forgot_password: Arc<IpLimiter>,
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            )),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(REGISTER_PER_MIN))),
            forgot_password: Arc::new(RateLimiter::keyed(Quota::per_minute(
                FORGOT_PASSWORD_PER_MIN,
            ))),
            trust_forwarded_for,
        }
    }

    fn client_key(&self, request: &Request) -> String {
        extract_client_ip(request, self.trust_forwarded_for)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

fn check(limiter: &IpLimiter, key: &str, endpoint: &'static str, message: &'static str) -> Option<Response> {
    match limiter.check_key(&key.to_string()) {
        Ok(_) => None,
        Err(_) => {
            warn!(stage = "rate_limit", endpoint, client = %key, "Request rejected");
            Some((StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": message }))).into_response())
        }
    }
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = config.client_key(&request);
    match check(
        &config.login,
        &key,
        "login",
        "Too many login attempts. Please wait before trying again.",
    ) {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = config.client_key(&request);
    match check(
        &config.register,
        &key,
        "register",
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}

/// Middleware for rate limiting password reset requests.
pub async fn rate_limit_forgot_password(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = config.client_key(&request);
    match check(
        &config.forgot_password,
        &key,
        "forgot_password",
        "Too many requests. Please try again later.",
    ) {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_burst_then_limited() {
        let config = RateLimitConfig::new(false);
        for _ in 0..LOGIN_BURST.get() {
            assert!(check(&config.login, "203.0.113.1", "login", "x").is_none());
        }
        let rejection = check(&config.login, "203.0.113.1", "login", "x").unwrap();
        assert_eq!(rejection.status(), StatusCode::TOO_MANY_REQUESTS);

        // Other clients keep their own bucket.
        assert!(check(&config.login, "203.0.113.2", "login", "x").is_none());
    }

    #[test]
    fn test_register_quota() {
        let config = RateLimitConfig::new(false);
        for _ in 0..REGISTER_PER_MIN.get() {
            assert!(check(&config.register, "198.51.100.4", "register", "x").is_none());
        }
        assert!(check(&config.register, "198.51.100.4", "register", "x").is_some());
    }
}
