/// Audit log model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audit action names.
pub mod actions {
    pub const LOGIN: &str = "LOGIN";
    pub const LOGOUT: &str = "LOGOUT";
    pub const LOGIN_FAILED: &str = "LOGIN_FAILED";
    pub const PASSWORD_CHANGED: &str = "PASSWORD_CHANGED";
    pub const RETENTION_SWEEP: &str = "RETENTION_SWEEP";
}

/// Audited resource types.
pub mod resources {
    pub const USER: &str = "USER";
}

/// Entry status values.
pub mod status {
    pub const SUCCESS: &str = "SUCCESS";
    pub const FAILURE: &str = "FAILURE";
}

/// Actor names used when no authenticated principal is available.
pub mod actors {
    /// Unauthenticated caller (e.g. a failed login).
    pub const ANONYMOUS: &str = "anonymous";
    /// Out-of-request invocations such as scheduled maintenance.
    pub const SYSTEM: &str = "system";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub username: String,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A security event to be appended to the audit trail. The store assigns
/// the id and the timestamp on insert.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub username: String,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
}

impl AuditEvent {
    pub fn success(actor: impl Into<String>, action: &str) -> Self {
        Self {
            username: actor.into(),
            action: action.to_string(),
            resource_type: None,
            resource_id: None,
            details: None,
            ip_address: None,
            user_agent: None,
            status: status::SUCCESS.to_string(),
            error_message: None,
        }
    }

    pub fn failure(actor: impl Into<String>, action: &str, error_message: &str) -> Self {
        Self {
            status: status::FAILURE.to_string(),
            error_message: Some(error_message.to_string()),
            ..Self::success(actor, action)
        }
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Filter for paginated audit queries. Results are always ordered by
/// timestamp descending.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub username: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: i64,
    pub per_page: i64,
}
