//! Authentication user types.

use crate::jwt::{AccessClaims, Identity};

/// Authenticated user information extracted from a bearer token.
/// Lives for the duration of one request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// JWT claims from the access token
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> i64 {
        self.claims.id
    }

    pub fn identity(&self) -> Identity {
        self.claims.identity()
    }
}
