//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use std::net::SocketAddr;
use std::{num::NonZeroU32, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for register and login.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub credentials: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Allow `per_minute` credential requests per IP (at least one).
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            credentials: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
        }
    }
}

/// Peer address of the connection, or a shared bucket when it is unknown.
fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for rate limiting register and login.
pub async fn rate_limit_credentials(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match config.credentials.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Credential rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many authentication attempts. Please wait before trying again.",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_per_key() {
        let config = RateLimitConfig::new(2);
        let a = "10.0.0.1".to_string();
        let b = "10.0.0.2".to_string();

        assert!(config.credentials.check_key(&a).is_ok());
        assert!(config.credentials.check_key(&a).is_ok());
        assert!(config.credentials.check_key(&a).is_err());
        assert!(config.credentials.check_key(&b).is_ok());
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let config = RateLimitConfig::new(0);
        let ip = "10.0.0.1".to_string();
        assert!(config.credentials.check_key(&ip).is_ok());
        assert!(config.credentials.check_key(&ip).is_err());
    }
}
