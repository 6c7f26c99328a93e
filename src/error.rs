//! Authentication error taxonomy.
//!
//! Variants stay distinct internally so they can be logged; `api::error` is
//! the single place where they are collapsed into user-safe responses.

use crate::jwt::JwtError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed request input, rejected before reaching the auth flow.
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("a user with this email already exists")]
    DuplicateUser,
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Missing, malformed, forged or expired access token.
    #[error("not authenticated")]
    Unauthenticated,
    /// Valid access token, but no live session for its subject.
    #[error("session expired")]
    SessionExpired,
    /// Token and session are valid but the account no longer exists.
    #[error("user not found")]
    UserNotFound,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    /// Valid refresh token whose session was deleted, expired or superseded.
    #[error("no active session")]
    NoActiveSession,
    #[error("insufficient role")]
    Forbidden,
    #[error(transparent)]
    Signing(#[from] JwtError),
    #[error("password hashing failed: {0}")]
    Password(String),
    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    /// Stable name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation",
            AuthError::DuplicateUser => "duplicate_user",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::SessionExpired => "session_expired",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidRefreshToken => "invalid_refresh_token",
            AuthError::NoActiveSession => "no_active_session",
            AuthError::Forbidden => "forbidden",
            AuthError::Signing(_) => "signing",
            AuthError::Password(_) => "password",
            AuthError::Database(_) => "database",
        }
    }

    /// Whether client-held tokens are useless after this error.
    pub fn clears_cookies(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthenticated | AuthError::SessionExpired | AuthError::UserNotFound
        )
    }
}
