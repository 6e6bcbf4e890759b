//! Session-bound anti-forgery protection.
//!
//! A session is created lazily by `GET /api/csrf-token`. State-changing
//! requests on guarded routes must then echo the session's token.

mod guard;
mod session;
mod token;

pub use guard::{CSRF_EXEMPT_PATHS, csrf_guard, csrf_token};
pub use session::{SESSION_COOKIE_NAME, SESSION_TTL_SECS, SessionError, SessionManager};
pub use token::{create_token, generate_secret, verify};
