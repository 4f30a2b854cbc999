use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Too many login attempts")]
    RateLimited,

    #[error("Account is locked due to multiple failed login attempts. Please try again later.")]
    AccountLocked,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Refresh token not found")]
    TokenNotFound,

    #[error("Refresh token has expired. Please login again.")]
    TokenExpired,

    #[error("Refresh token has been revoked")]
    TokenRevoked,

    #[error("Current password is incorrect")]
    PasswordMismatch,

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::AccountLocked => StatusCode::LOCKED,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::TokenNotFound
            | AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::PasswordMismatch
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Store errors are surfaced to callers as an opaque 500; the cause
        // stays in the server logs.
        let message = match &self {
            AuthError::Database(msg) | AuthError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}
