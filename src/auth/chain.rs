//! Per-request authentication middleware and the identity extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::cookie::{ACCESS_COOKIE_NAME, bearer_token, cleared_cookies, get_cookie};
use super::flow::find_live_session;
use super::state::HasAuthBackend;
use crate::db::PublicUser;
use crate::error::AuthError;
use crate::jwt::TokenKind;

/// Resolve the caller's identity from an access token.
///
/// 1. Bearer header, else `access_token` cookie.
/// 2. Signature and expiry against the access public key.
/// 3. Live session for the token's subject and session id.
/// 4. Current user by the id in the session snapshot, so role changes since
///    login are observed.
pub async fn authenticate_request<S>(headers: &HeaderMap, state: &S) -> Result<PublicUser, AuthError>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = bearer_token(headers)
        .or_else(|| get_cookie(headers, ACCESS_COOKIE_NAME))
        .ok_or(AuthError::Unauthenticated)?;

    let claims = state
        .jwt()
        .verify(token, TokenKind::Access)
        .ok_or(AuthError::Unauthenticated)?;

    let session = find_live_session(state.db(), &claims)
        .await?
        .ok_or(AuthError::SessionExpired)?;

    state
        .db()
        .users()
        .get_by_id(&session.snapshot.id)
        .await?
        .ok_or(AuthError::UserNotFound)
}

/// Identity attached to the request by [`deserialize_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

/// Middleware that authenticates the request and attaches [`CurrentUser`].
///
/// Rejections that leave the client's tokens useless also expire its cookies,
/// with the same `Secure` flag they were issued with.
pub async fn deserialize_user<S>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
{
    let authenticated = authenticate_request(request.headers(), &state).await;
    match authenticated {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(e) => {
            let clear = e.clears_cookies();
            let mut response = e.into_response();
            if clear {
                let headers = response.headers_mut();
                for cookie in cleared_cookies(state.settings().secure_cookies) {
                    if let Ok(value) = HeaderValue::from_str(&cookie) {
                        headers.append(header::SET_COOKIE, value);
                    }
                }
            }
            response
        }
    }
}

/// Reads the identity attached by the middleware. Fails closed when the
/// handler is reachable without it.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
