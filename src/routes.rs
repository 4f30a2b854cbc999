/// Route definitions and middleware setup
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::handlers::{
    change_password, cleanup_audit_logs, get_audit_logs, get_recent_audit_logs, login, logout,
    refresh_token, validate_token,
};
use crate::openapi::ApiDoc;
use crate::{metrics, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Authentication endpoints
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh_token))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/validate", get(validate_token))
        // Audit trail (ADMIN only)
        .route("/api/audit-logs", get(get_audit_logs))
        .route("/api/audit-logs/recent", get(get_recent_audit_logs))
        .route("/api/audit-logs/cleanup", delete(cleanup_audit_logs))
        // Operability
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Generated OpenAPI document
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
