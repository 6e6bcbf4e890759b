//! Cookie-addressed anti-forgery sessions.
//!
//! The cookie carries only `<session id>.<signature>`; the secret and the
//! issued token live in the `sessions` table. Sessions expire 24 hours after
//! creation and are never extended.

use std::sync::Arc;

use axum::http::HeaderMap;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use openssl::{error::ErrorStack, hash::MessageDigest, pkey::PKey, sign::Signer};
use tracing::debug;

use super::token;
use crate::auth::get_cookie;
use crate::db::{Database, SessionRecord};

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "mountify.csrf.sid";

/// Session lifetime: 24 hours.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Errors raised while reading or writing sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("failed to sign session id: {0}")]
    Signing(#[from] ErrorStack),
}

/// Owns the session store and the cookie signing key.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    signing_key: Arc<Vec<u8>>,
    secure_cookies: bool,
}

impl SessionManager {
    pub fn new(db: Database, signing_key: &[u8], secure_cookies: bool) -> Self {
        Self {
            db,
            signing_key: Arc::new(signing_key.to_vec()),
            secure_cookies,
        }
    }

    fn sign(&self, id: &str) -> Result<String, ErrorStack> {
        let key = PKey::hmac(&self.signing_key)?;
        let mut signer = Signer::new(MessageDigest::sha256(), &key)?;
        signer.update(id.as_bytes())?;
        Ok(URL_SAFE_NO_PAD.encode(signer.sign_to_vec()?))
    }

    /// Session id from the cookie, if present and correctly signed.
    fn session_id(&self, headers: &HeaderMap) -> Result<Option<String>, SessionError> {
        let Some(value) = get_cookie(headers, SESSION_COOKIE_NAME) else {
            return Ok(None);
        };
        let Some((id, signature)) = value.split_once('.') else {
            debug!("Malformed session cookie");
            return Ok(None);
        };

        let expected = self.sign(id)?;
        if expected.len() != signature.len()
            || !openssl::memcmp::eq(expected.as_bytes(), signature.as_bytes())
        {
            debug!("Session cookie signature mismatch");
            return Ok(None);
        }

        Ok(Some(id.to_string()))
    }

    /// Load the live session referenced by the request cookie.
    pub async fn load(&self, headers: &HeaderMap) -> Result<Option<SessionRecord>, SessionError> {
        let Some(id) = self.session_id(headers)? else {
            return Ok(None);
        };
        Ok(self.db.sessions().get(&id, now_secs()).await?)
    }

    /// Return the session token, creating the session and token on first use.
    ///
    /// The second element is a `Set-Cookie` value when a new session was created.
    pub async fn issue_token(
        &self,
        headers: &HeaderMap,
    ) -> Result<(String, Option<String>), SessionError> {
        let (mut record, cookie) = match self.load(headers).await? {
            Some(record) => (record, None),
            None => {
                let record = SessionRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    csrf_secret: token::generate_secret(),
                    csrf_token: None,
                    expires_at: now_secs() + SESSION_TTL_SECS,
                };
                let cookie = self.cookie(&record.id)?;
                (record, Some(cookie))
            }
        };

        if let Some(existing) = &record.csrf_token {
            if token::verify(&record.csrf_secret, existing) {
                return Ok((existing.clone(), cookie));
            }
        }

        let issued = token::create_token(&record.csrf_secret);
        record.csrf_token = Some(issued.clone());
        self.db.sessions().save(&record).await?;

        Ok((issued, cookie))
    }

    /// Destroy the request's session. Returns a cookie that clears it in the browser.
    pub async fn destroy(&self, headers: &HeaderMap) -> Result<String, SessionError> {
        if let Some(id) = self.session_id(headers)? {
            self.db.sessions().delete(&id).await?;
        }
        Ok(self.clear_cookie())
    }

    fn cookie(&self, id: &str) -> Result<String, SessionError> {
        Ok(format!(
            "{}={}.{}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
            SESSION_COOKIE_NAME,
            id,
            self.sign(id)?,
            SESSION_TTL_SECS,
            self.secure_suffix()
        ))
    }

    fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
            SESSION_COOKIE_NAME,
            self.secure_suffix()
        )
    }

    fn secure_suffix(&self) -> &'static str {
        if self.secure_cookies { "; Secure" } else { "" }
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
