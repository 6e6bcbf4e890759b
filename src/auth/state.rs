//! Access to the token verifier from router state.

use crate::jwt::JwtConfig;

/// Router states that can verify bearer tokens for [`Auth`](super::Auth).
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
}

/// Implement [`HasAuthBackend`] for a state struct holding `jwt: Arc<JwtConfig>`.
///
/// ```ignore
/// #[derive(Clone)]
/// pub struct PublicState {
///     pub db: Database,
///     pub jwt: Arc<JwtConfig>,
/// }
///
/// crate::impl_has_auth_backend!(PublicState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state:ty) => {
        impl $crate::auth::HasAuthBackend for $state {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
        }
    };
}
