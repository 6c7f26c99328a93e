//! Authentication settings, state trait and macro.

use std::time::Duration;

use super::flow::AuthFlow;
use crate::db::Database;
use crate::jwt::TokenCodec;

/// Token and session lifetimes plus cookie policy.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub session_ttl: Duration,
    /// Whether to set the Secure flag on cookies (should be true behind HTTPS)
    pub secure_cookies: bool,
}

impl AuthSettings {
    pub fn new(
        access_token_ttl_minutes: u64,
        refresh_token_ttl_minutes: u64,
        session_ttl_seconds: u64,
        secure_cookies: bool,
    ) -> Self {
        Self {
            access_token_ttl: Duration::from_secs(access_token_ttl_minutes.saturating_mul(60)),
            refresh_token_ttl: Duration::from_secs(refresh_token_ttl_minutes.saturating_mul(60)),
            session_ttl: Duration::from_secs(session_ttl_seconds),
            secure_cookies,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::new(15, 60, 60 * 60, false)
    }
}

/// Trait for state types that provide what the auth flow and chain need.
pub trait HasAuthBackend {
    fn jwt(&self) -> &TokenCodec;
    fn db(&self) -> &Database;
    fn settings(&self) -> &AuthSettings;

    fn flow(&self) -> AuthFlow<'_> {
        AuthFlow::new(self.db(), self.jwt(), self.settings())
    }
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<TokenCodec>`
/// - `db: Database`
/// - `settings: Arc<AuthSettings>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub jwt: Arc<TokenCodec>,
///     pub settings: Arc<AuthSettings>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::TokenCodec {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn settings(&self) -> &$crate::auth::AuthSettings {
                &self.settings
            }
        }
    };
}
