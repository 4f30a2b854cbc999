/// Authentication handlers
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{
        header::{AUTHORIZATION, USER_AGENT},
        HeaderMap,
    },
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AuthError,
    middleware::AuthUser,
    models::user::{ChangePasswordRequest, LoginRequest, RefreshTokenRequest},
    services::{AuthSession, ClientMeta},
    AppState,
};

/// Login / refresh response carrying both tokens.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            token_type: "Bearer".to_string(),
            username: session.username,
            email: session.email,
            roles: session.roles,
        }
    }
}

/// Generic confirmation response
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Resolve the client address, honouring proxy headers.
/// `X-Forwarded-For` may carry a chain; the first entry is the caller.
fn client_meta(headers: &HeaderMap, peer: SocketAddr) -> ClientMeta {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .filter(|ip| !ip.is_empty());

    let ip = forwarded
        .or(real_ip)
        .unwrap_or_else(|| peer.ip().to_string());

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    ClientMeta { ip, user_agent }
}

/// Login endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 423, description = "Account locked"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    payload
        .validate()
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let client = client_meta(&headers, peer);
    let session = state
        .auth
        .login(&payload.username, &payload.password, &client)
        .await?;

    Ok(Json(session.into()))
}

/// Refresh token endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token issued", body = AuthResponse),
        (status = 400, description = "Token not found, expired or revoked")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    payload
        .validate()
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let session = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(session.into()))
}

/// Logout endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Token not found")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    payload
        .validate()
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let client = client_meta(&headers, peer);
    state.auth.logout(&payload.refresh_token, &client).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Change password endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect"),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    payload
        .validate()
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let account = state.auth.require_account(&user.username).await?;
    let client = client_meta(&headers, peer);
    state
        .auth
        .change_password(
            &account,
            &payload.current_password,
            &payload.new_password,
            &client,
        )
        .await?;

    Ok(Json(MessageResponse::new(
        "Password changed successfully. Please login again.",
    )))
}

/// Access token validation endpoint handler
#[utoipa::path(
    get,
    path = "/api/auth/validate",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = MessageResponse),
        (status = 400, description = "Invalid token")
    )
)]
pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::Validation("Invalid token".to_string()))?;

    state
        .issuer
        .validate(token)
        .map_err(|_| AuthError::Validation("Invalid token".to_string()))?;

    Ok(Json(MessageResponse::new("Token is valid")))
}
