//! Register, login, refresh and logout.
//!
//! A subject is logged in exactly when a live session row exists for it and
//! its `session_id` matches the `sid` carried by the presented token. Login
//! overwrites any earlier session, logout deletes it.

use std::sync::LazyLock;

use tracing::{debug, info};

use super::state::AuthSettings;
use crate::db::{Database, NewUserRecord, PublicUser, Session, UserRole, is_unique_violation};
use crate::error::AuthError;
use crate::jwt::{IssuedToken, TokenClaims, TokenCodec, TokenKind, unix_now};
use crate::password::{hash_password, verify_password};

/// Verified against when the email is unknown, so both failure paths hash once.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("tollgate-dummy-password").ok());

/// Registration input. Assumed to have passed request validation already.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub user: PublicUser,
}

/// Result of a successful refresh. The refresh token is not rotated.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access: IssuedToken,
    pub user: PublicUser,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Look up the session a verified token belongs to.
///
/// A row for the same subject minted by a later login does not count.
pub async fn find_live_session(
    db: &Database,
    claims: &TokenClaims,
) -> Result<Option<Session>, AuthError> {
    let session = db.sessions().get(&claims.sub, unix_now()?).await?;
    Ok(session.filter(|s| {
        let current = s.session_id == claims.sid;
        if !current {
            debug!(subject = %claims.sub, "Token belongs to a superseded session");
        }
        current
    }))
}

pub struct AuthFlow<'a> {
    db: &'a Database,
    jwt: &'a TokenCodec,
    settings: &'a AuthSettings,
}

impl<'a> AuthFlow<'a> {
    pub fn new(db: &'a Database, jwt: &'a TokenCodec, settings: &'a AuthSettings) -> Self {
        Self { db, jwt, settings }
    }

    /// Create a user with the default role. Does not log the user in.
    pub async fn register(&self, new_user: NewUser) -> Result<PublicUser, AuthError> {
        let record = NewUserRecord {
            email: normalize_email(&new_user.email),
            name: new_user.name.trim().to_string(),
            password_hash: hash_password(&new_user.password)?,
            role: UserRole::User,
        };

        match self.db.users().create(&record).await {
            Ok(user) => {
                info!(user_id = %user.id, "User registered");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(AuthError::DuplicateUser),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials, mint a token pair and replace the subject's session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginTokens, AuthError> {
        let user = match self.db.users().get_by_email(&normalize_email(email)).await? {
            Some(user) if user.verify_password(password) => user,
            Some(user) => {
                debug!(user_id = %user.id, "Login rejected: wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                if let Some(hash) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(hash, password);
                }
                debug!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        let access = self.jwt.sign(
            &user.id,
            &session_id,
            TokenKind::Access,
            self.settings.access_token_ttl,
        )?;
        let refresh = self.jwt.sign(
            &user.id,
            &session_id,
            TokenKind::Refresh,
            self.settings.refresh_token_ttl,
        )?;

        let snapshot = user.redact();
        self.db
            .sessions()
            .put(
                &user.id,
                &session_id,
                &snapshot,
                self.settings.session_ttl.as_secs(),
                unix_now()?,
            )
            .await?;

        info!(user_id = %user.id, "User logged in");

        Ok(LoginTokens {
            access,
            refresh,
            user: snapshot,
        })
    }

    /// Mint a new access token from a refresh token whose session is still live.
    ///
    /// The user is re-read by id, so the returned identity reflects role or
    /// profile changes made since login. A deleted user fails the same way as
    /// a missing session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        let claims = self
            .jwt
            .verify(refresh_token, TokenKind::Refresh)
            .ok_or(AuthError::InvalidRefreshToken)?;

        let session = find_live_session(self.db, &claims)
            .await?
            .ok_or(AuthError::NoActiveSession)?;

        let Some(user) = self.db.users().get_by_id(&session.snapshot.id).await? else {
            debug!(subject = %claims.sub, "Refresh rejected: user no longer exists");
            return Err(AuthError::NoActiveSession);
        };

        let access = self.jwt.sign(
            &user.id,
            &session.session_id,
            TokenKind::Access,
            self.settings.access_token_ttl,
        )?;

        debug!(user_id = %user.id, "Access token refreshed");

        Ok(RefreshedAccess { access, user })
    }

    /// Delete the session of an authenticated user. Idempotent.
    pub async fn logout(&self, identity: &PublicUser) -> Result<(), AuthError> {
        let existed = self.db.sessions().delete(&identity.id).await?;
        info!(user_id = %identity.id, existed, "User logged out");
        Ok(())
    }
}
