//! Delivery of password reset links.
//!
//! Mail delivery lives outside this service. The default notifier only logs.

use tracing::info;

/// Receives password reset links for known accounts.
pub trait PasswordResetNotifier: Send + Sync {
    fn send_reset_link(&self, email: &str, link: &str);
}

/// Writes reset links to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl PasswordResetNotifier for LogNotifier {
    fn send_reset_link(&self, email: &str, link: &str) {
        info!(email = %email, link = %link, "Password reset requested");
    }
}
