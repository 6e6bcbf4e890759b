//! Bearer token generation and validation.
//!
//! Tokens are stateless: nothing is stored server-side and there is no
//! revocation list. A token stays valid until its `exp` even if the account
//! is deactivated or its password changes in the meantime.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Minimum accepted length of the signing secret.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Default access token lifetime: 1 day.
pub const DEFAULT_ACCESS_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// Password reset token lifetime: 1 hour.
pub const RESET_TOKEN_DURATION_SECS: u64 = 60 * 60;

/// Token type for distinguishing login tokens from password reset tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Reset,
}

/// Identity embedded in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl AccessClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// JWT claims for password reset tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub email: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Result of generating a token.
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_duration: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and access token lifetime.
    pub fn new(secret: &[u8], access_duration: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_duration,
        }
    }

    /// Issue an access token for a user at login.
    pub fn generate_access_token(
        &self,
        user_id: i64,
        email: &str,
        role: UserRole,
    ) -> Result<TokenResult, JwtError> {
        let now = now_secs()?;
        let exp = now + self.access_duration;

        let claims = AccessClaims {
            id: user_id,
            email: email.to_string(),
            role,
            token_type: TokenType::Access,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(TokenResult {
            token,
            expires_at: exp,
            duration: self.access_duration,
        })
    }

    /// Issue a short-lived password reset token.
    pub fn generate_reset_token(&self, email: &str) -> Result<TokenResult, JwtError> {
        let now = now_secs()?;
        let exp = now + RESET_TOKEN_DURATION_SECS;

        let claims = ResetClaims {
            email: email.to_string(),
            token_type: TokenType::Reset,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(TokenResult {
            token,
            expires_at: exp,
            duration: RESET_TOKEN_DURATION_SECS,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &strict_validation())
                .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a password reset token.
    pub fn validate_reset_token(&self, token: &str) -> Result<ResetClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<ResetClaims>(token, &self.decoding_key, &strict_validation())
                .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Reset {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Parse a token lifetime such as `1d`, `12h`, `30m`, `45s` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<u64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (digits, multiplier) = match value.char_indices().last() {
        Some((idx, 'd')) => (&value[..idx], 24 * 60 * 60),
        Some((idx, 'h')) => (&value[..idx], 60 * 60),
        Some((idx, 'm')) => (&value[..idx], 60),
        Some((idx, 's')) => (&value[..idx], 1),
        _ => (value, 1),
    };

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid duration: {}", value))?;

    if amount == 0 {
        return Err(format!("Duration must be positive: {}", value));
    }

    amount
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration is too large: {}", value))
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Failed to decode token: {0}")]
    Decoding(jsonwebtoken::errors::Error),
    #[error("System time error")]
    TimeError,
    /// Wrong token type (e.g., using a reset token as a bearer token)
    #[error("Wrong token type")]
    WrongTokenType,
}
