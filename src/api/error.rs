//! The single mapping from internal auth errors to client responses.
//!
//! Distinctions that would leak information (expired vs forged token, unknown
//! email vs wrong password) are already collapsed in `AuthError`; the ones
//! that remain are logged here and reduced to a status and a fixed message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, info};

use crate::error::AuthError;

impl AuthError {
    /// Status code and user-safe message for this error.
    pub fn public_parts(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, *msg),
            AuthError::DuplicateUser => (StatusCode::CONFLICT, "Email already exists"),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "You are not logged in"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Your session has expired"),
            AuthError::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "The user belonging to this token no longer exists",
            ),
            AuthError::InvalidRefreshToken | AuthError::NoActiveSession => {
                (StatusCode::FORBIDDEN, "Could not refresh access token")
            }
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You are not allowed to perform this action",
            ),
            AuthError::Signing(_) | AuthError::Password(_) | AuthError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = self.public_parts();

        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            info!(kind = self.kind(), status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            status: if status.is_server_error() {
                "error"
            } else {
                "fail"
            },
            message,
        };
        (status, Json(body)).into_response()
    }
}
