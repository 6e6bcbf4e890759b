//! Password hashing with Argon2id.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use std::sync::LazyLock;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Verified against when the account does not exist, so unknown and known
/// emails cost the same.
static DECOY_HASH: LazyLock<String> =
    LazyLock::new(|| hash("mountify-decoy-password").unwrap_or_default());

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("Password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn salt() -> Result<SaltString, argon2::password_hash::Error> {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    SaltString::encode_b64(&bytes)
}

/// Hash a password into a PHC string.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt()?)
        .map(|h| h.to_string())
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// [`hash`] on the blocking thread pool.
pub async fn hash_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash(&password))
        .await?
        .map_err(PasswordError::Hash)
}

/// [`verify`] on the blocking thread pool. With no stored hash the decoy is
/// checked and the result is always `false`.
pub async fn verify_blocking(password: String, stored: Option<String>) -> Result<bool, PasswordError> {
    let matched = tokio::task::spawn_blocking(move || match stored {
        Some(stored) => verify(&password, &stored),
        None => {
            verify(&password, &DECOY_HASH);
            false
        }
    })
    .await?;
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify("correct horse", &stored));
        assert!(!verify("wrong horse", &stored));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash("same").unwrap(), hash("same").unwrap());
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let stored = hash_blocking("correct horse".to_string()).await.unwrap();
        assert!(verify_blocking("correct horse".to_string(), Some(stored.clone())).await.unwrap());
        assert!(!verify_blocking("wrong horse".to_string(), Some(stored)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_account_checks_decoy() {
        assert!(DECOY_HASH.starts_with("$argon2id$"));
        assert!(!verify_blocking("mountify-decoy-password".to_string(), None).await.unwrap());
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify("anything", "not-a-hash"));
        assert!(!verify("", ""));
    }
}
