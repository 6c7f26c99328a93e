mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthSettings;
use crate::db::Database;
use crate::jwt::TokenCodec;
use crate::rate_limit::RateLimitConfig;

pub use auth::AuthState;
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<TokenCodec>,
    settings: Arc<AuthSettings>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
        settings: settings.clone(),
        rate_limit_config,
    };

    let users_state = users::UsersState { db, jwt, settings };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/users", users::router(users_state))
}
