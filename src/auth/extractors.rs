//! Axum extractors and middleware for bearer authentication and role checks.

use std::marker::PhantomData;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Extensions, HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::UserRole;

/// Set of roles allowed on a route.
pub trait RoleConstraint: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
}

/// Any authenticated user.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_role: UserRole) -> bool {
        true
    }
}

/// `admin` and `superadmin`.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role.is_admin()
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verify the bearer token. A user already placed in the request extensions
/// by [`require_role`] is reused instead of decoding the token again.
fn authenticate<S: HasAuthBackend>(
    headers: &HeaderMap,
    extensions: &Extensions,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind> {
    if let Some(user) = extensions.get::<AuthenticatedUser>() {
        return Ok(user.clone());
    }

    let token = bearer_token(headers).ok_or(AuthErrorKind::MissingToken)?;
    let claims = state.jwt().validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Bearer token rejected");
        AuthErrorKind::InvalidToken
    })?;

    Ok(AuthenticatedUser { claims })
}

fn authorize<R: RoleConstraint>(user: &AuthenticatedUser) -> Result<(), AuthErrorKind> {
    if R::allows(user.claims.role) {
        Ok(())
    } else {
        Err(AuthErrorKind::InsufficientRole)
    }
}

fn reject(kind: AuthErrorKind, path: &str, user: Option<&AuthenticatedUser>) -> ApiAuthError {
    let stage = match kind {
        AuthErrorKind::InsufficientRole => "role",
        _ => "auth",
    };
    warn!(
        stage,
        reason = ?kind,
        path = %path,
        user_id = user.map(|u| u.user_id()),
        "Request rejected"
    );
    ApiAuthError::new(kind)
}

/// Extractor for endpoints that require a bearer token and a role in `R`.
pub struct Auth<R: RoleConstraint = AnyRole> {
    pub user: AuthenticatedUser,
    _role: PhantomData<fn() -> R>,
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate(&parts.headers, &parts.extensions, state)
            .map_err(|kind| reject(kind, parts.uri.path(), None))?;
        authorize::<R>(&user).map_err(|kind| reject(kind, parts.uri.path(), Some(&user)))?;
        Ok(Auth {
            user,
            _role: PhantomData,
        })
    }
}

/// Route-layer middleware running the bearer and role gates before anything
/// inside it. The verified user is stored in the request extensions.
pub async fn require_role<S, R>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
    R: RoleConstraint,
{
    let path = request.uri().path().to_string();
    let user = match authenticate(request.headers(), request.extensions(), &state) {
        Ok(user) => user,
        Err(kind) => return reject(kind, &path, None).into_response(),
    };
    if let Err(kind) = authorize::<R>(&user) {
        return reject(kind, &path, Some(&user)).into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use axum::http::HeaderValue;

    struct TestState {
        jwt: JwtConfig,
    }

    impl HasAuthBackend for TestState {
        fn jwt(&self) -> &JwtConfig {
            &self.jwt
        }
    }

    fn state() -> TestState {
        TestState {
            jwt: JwtConfig::new(b"extractor-test-secret-0123456789abcdef", 60),
        }
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_authenticate_outcomes() {
        let state = state();
        let extensions = Extensions::new();

        let err = authenticate(&HeaderMap::new(), &extensions, &state).unwrap_err();
        assert_eq!(err, AuthErrorKind::MissingToken);

        let err = authenticate(&headers_with("Bearer garbage"), &extensions, &state).unwrap_err();
        assert_eq!(err, AuthErrorKind::InvalidToken);

        let token = state
            .jwt
            .generate_access_token(5, "u@example.com", UserRole::User)
            .unwrap()
            .token;
        let user = authenticate(
            &headers_with(&format!("Bearer {}", token)),
            &extensions,
            &state,
        )
        .unwrap();
        assert_eq!(user.user_id(), 5);
        assert_eq!(user.identity().email, "u@example.com");
    }

    #[test]
    fn test_reset_token_is_not_a_bearer_token() {
        let state = state();
        let token = state.jwt.generate_reset_token("u@example.com").unwrap().token;
        let err = authenticate(
            &headers_with(&format!("Bearer {}", token)),
            &Extensions::new(),
            &state,
        )
        .unwrap_err();
        assert_eq!(err, AuthErrorKind::InvalidToken);
    }

    #[test]
    fn test_role_constraints() {
        assert!(AnyRole::allows(UserRole::User));
        assert!(!AdminOnly::allows(UserRole::User));
        assert!(AdminOnly::allows(UserRole::Admin));
        assert!(AdminOnly::allows(UserRole::Superadmin));
    }
}
