//! Role-based authorization, applied after [`deserialize_user`](super::deserialize_user).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::chain::CurrentUser;
use crate::db::{PublicUser, UserRole};
use crate::error::AuthError;

/// Pass `identity` through if its role is one of `allowed`.
///
/// A missing identity is rejected, never waved through.
pub fn authorize<'a>(
    identity: Option<&'a PublicUser>,
    allowed: &[UserRole],
) -> Result<&'a PublicUser, AuthError> {
    let identity = identity.ok_or(AuthError::Unauthenticated)?;
    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Middleware state listing the roles a route accepts.
#[derive(Debug, Clone)]
pub struct RequiredRoles(Arc<[UserRole]>);

impl RequiredRoles {
    pub fn new(roles: &[UserRole]) -> Self {
        Self(roles.into())
    }

    pub fn admin() -> Self {
        Self::new(&[UserRole::Admin])
    }
}

/// Middleware that rejects requests whose attached identity lacks a required role.
pub async fn restrict_to(
    State(roles): State<RequiredRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = request.extensions().get::<CurrentUser>().map(|c| &c.0);
    if let Err(e) = authorize(identity, &roles.0) {
        tracing::warn!(
            user_id = identity.map(|u| u.id.as_str()).unwrap_or("-"),
            "Authorization denied"
        );
        return Err(e);
    }
    Ok(next.run(request).await)
}
