//! Anti-forgery token derivation and verification.
//!
//! A session owns a random secret. Tokens are `<salt>-<digest>` where the
//! digest is `base64url(sha256(salt + "-" + secret))`, so any number of tokens
//! can be minted for one secret and each can be checked against it without
//! storing the token itself.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};

/// Secret length in bytes before encoding.
const SECRET_BYTES: usize = 18;

/// Salt length in characters.
const SALT_LENGTH: usize = 8;

/// Generate a new random per-session secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive a fresh token from a secret.
pub fn create_token(secret: &str) -> String {
    let salt: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();
    tokenize(&salt, secret)
}

/// Check that `token` was derived from `secret`.
pub fn verify(secret: &str, token: &str) -> bool {
    let Some((salt, _)) = token.split_once('-') else {
        return false;
    };
    if salt.is_empty() {
        return false;
    }

    let expected = tokenize(salt, secret);
    expected.len() == token.len() && openssl::memcmp::eq(expected.as_bytes(), token.as_bytes())
}

fn tokenize(salt: &str, secret: &str) -> String {
    let digest = openssl::sha::sha256(format!("{}-{}", salt, secret).as_bytes());
    format!("{}-{}", salt, URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_verifies_against_its_secret() {
        let secret = generate_secret();
        let token = create_token(&secret);
        assert!(verify(&secret, &token));
    }

    #[test]
    fn test_each_token_is_distinct_but_valid() {
        let secret = generate_secret();
        let a = create_token(&secret);
        let b = create_token(&secret);
        assert_ne!(a, b);
        assert!(verify(&secret, &a));
        assert!(verify(&secret, &b));
    }

    #[test]
    fn test_token_rejected_for_other_secret() {
        let token = create_token(&generate_secret());
        assert!(!verify(&generate_secret(), &token));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let secret = generate_secret();
        assert!(!verify(&secret, ""));
        assert!(!verify(&secret, "invalid-token"));
        assert!(!verify(&secret, "no_separator"));
        assert!(!verify(&secret, "-onlydigest"));

        let token = create_token(&secret);
        assert!(!verify(&secret, &format!("{}x", token)));
        assert!(!verify(&secret, &token[..token.len() - 1]));
    }

    #[test]
    fn test_secret_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 24);
        assert_ne!(secret, generate_secret());
    }
}
