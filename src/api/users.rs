//! User API endpoints. Every route requires authentication.
//!
//! - GET `/me` - The caller's current profile
//! - GET `/` - All users (admin only)

use axum::{Json, Router, extract::State, middleware, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthSettings, CurrentUser, RequiredRoles, deserialize_user, restrict_to};
use crate::db::{Database, PublicUser};
use crate::error::AuthError;
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<TokenCodec>,
    pub settings: Arc<AuthSettings>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let admin = Router::new()
        .route("/", get(list_users))
        .route_layer(middleware::from_fn_with_state(
            RequiredRoles::admin(),
            restrict_to,
        ));

    Router::new()
        .route("/me", get(get_me))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            deserialize_user::<UsersState>,
        ))
        .with_state(state)
}

#[derive(Serialize)]
struct MeData {
    user: PublicUser,
}

#[derive(Serialize)]
struct MeResponse {
    status: &'static str,
    data: MeData,
}

async fn get_me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(MeResponse {
        status: "success",
        data: MeData { user },
    })
}

#[derive(Serialize)]
struct UsersData {
    users: Vec<PublicUser>,
}

#[derive(Serialize)]
struct ListUsersResponse {
    status: &'static str,
    results: usize,
    data: UsersData,
}

async fn list_users(State(state): State<UsersState>) -> Result<impl IntoResponse, AuthError> {
    let users = state.db.users().list_all().await?;

    Ok(Json(ListUsersResponse {
        status: "success",
        results: users.len(),
        data: UsersData { users },
    }))
}
