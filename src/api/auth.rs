//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account (does not log in)
//! - POST `/login` - Exchange credentials for an access/refresh token pair
//! - POST `/refresh` - Exchange the refresh token cookie for a new access token
//! - POST `/logout` - Delete the caller's session and clear cookies

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{
    AuthSettings, CurrentUser, HasAuthBackend, NewUser, REFRESH_COOKIE_NAME, cleared_cookies,
    deserialize_user, get_cookie, session_cookies,
};
use crate::db::{Database, PublicUser};
use crate::error::AuthError;
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;
use crate::rate_limit::{RateLimitConfig, rate_limit_credentials};

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 32;
const MAX_NAME_CHARS: usize = 64;

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<TokenCodec>,
    pub settings: Arc<AuthSettings>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            deserialize_user::<AuthState>,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_credentials,
        ))
        .route("/refresh", post(refresh))
        .merge(protected)
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    password_confirm: String,
}

#[derive(Serialize)]
struct UserData {
    user: PublicUser,
}

#[derive(Serialize)]
struct UserResponse {
    status: &'static str,
    data: UserData,
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), AuthError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("Name is required"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AuthError::Validation("Name is too long"));
    }

    if !is_plausible_email(payload.email.trim()) {
        return Err(AuthError::Validation("Invalid email"));
    }

    let password_len = payload.password.chars().count();
    if password_len < MIN_PASSWORD_CHARS {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters",
        ));
    }
    if password_len > MAX_PASSWORD_CHARS {
        return Err(AuthError::Validation(
            "Password must be at most 32 characters",
        ));
    }
    if payload.password != payload.password_confirm {
        return Err(AuthError::Validation("Passwords do not match"));
    }

    Ok(())
}

/// `local@domain.tld` with no whitespace.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_registration(&payload)?;

    let user = state
        .flow()
        .register(NewUser {
            email: payload.email,
            name: payload.name,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            status: "success",
            data: UserData { user },
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    status: &'static str,
    access_token: String,
    refresh_token: String,
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation("Email and password are required"));
    }

    let tokens = state.flow().login(&payload.email, &payload.password).await?;

    let cookies = session_cookies(
        &tokens.access,
        Some(&tokens.refresh),
        state.settings.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        AppendHeaders(cookies.into_iter().map(|c| (SET_COOKIE, c))),
        Json(LoginResponse {
            status: "success",
            access_token: tokens.access.token,
            refresh_token: tokens.refresh.token,
        }),
    ))
}

#[derive(Serialize)]
struct RefreshResponse {
    status: &'static str,
    access_token: String,
}

async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let refresh_token =
        get_cookie(&headers, REFRESH_COOKIE_NAME).ok_or(AuthError::InvalidRefreshToken)?;

    let refreshed = state.flow().refresh(refresh_token).await?;

    let cookies = session_cookies(&refreshed.access, None, state.settings.secure_cookies);

    Ok((
        StatusCode::OK,
        AppendHeaders(cookies.into_iter().map(|c| (SET_COOKIE, c))),
        Json(RefreshResponse {
            status: "success",
            access_token: refreshed.access.token,
        }),
    ))
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn logout(
    State(state): State<AuthState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AuthError> {
    state.flow().logout(&user).await?;

    let cookies = cleared_cookies(state.settings.secure_cookies);

    Ok((
        StatusCode::OK,
        AppendHeaders(cookies.map(|c| (SET_COOKIE, c))),
        Json(StatusResponse { status: "success" }),
    ))
}
