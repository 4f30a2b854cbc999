/// Audit trail handlers (ADMIN only)
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::{
    error::AuthError,
    handlers::auth::MessageResponse,
    middleware::AdminUser,
    models::audit_log::AuditLogFilter,
    models::{AuditLog, Page},
    AppState,
};

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
    pub username: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn default_page_size() -> i64 {
    20
}

impl From<AuditLogQuery> for AuditLogFilter {
    fn from(query: AuditLogQuery) -> Self {
        AuditLogFilter {
            username: query.username,
            action: query.action,
            resource_type: query.resource_type,
            from: query.start_date,
            to: query.end_date,
            page: query.page.max(0),
            per_page: query.size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// Filtered, paginated audit log listing, newest first
#[utoipa::path(
    get,
    path = "/api/audit-logs",
    tag = "Audit",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of audit log entries"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn get_audit_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Page<AuditLog>>, AuthError> {
    let page = state.auth.audit().find(&query.into()).await?;
    Ok(Json(page))
}

/// The ten most recent audit log entries
#[utoipa::path(
    get,
    path = "/api/audit-logs/recent",
    tag = "Audit",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Most recent entries", body = Vec<AuditLog>),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn get_recent_audit_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<AuditLog>>, AuthError> {
    let filter = AuditLogFilter {
        page: 0,
        per_page: 10,
        ..AuditLogFilter::default()
    };
    let page = state.auth.audit().find(&filter).await?;
    Ok(Json(page.items))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: i64,
}

fn default_days_to_keep() -> i64 {
    90
}

/// Delete audit log entries older than the retention window
#[utoipa::path(
    delete,
    path = "/api/audit-logs/cleanup",
    tag = "Audit",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Old entries removed", body = MessageResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn cleanup_audit_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<MessageResponse>, AuthError> {
    let cutoff = state.clock.now() - Duration::days(query.days_to_keep.max(0));
    let deleted = state.auth.audit().delete_older_than(cutoff).await?;

    Ok(Json(MessageResponse {
        message: format!("Cleaned up {deleted} old audit log entries"),
    }))
}
