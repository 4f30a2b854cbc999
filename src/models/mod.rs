/// Data models for authentication
pub mod audit_log;
pub mod refresh_token;
pub mod user;

pub use audit_log::AuditLog;
pub use refresh_token::RefreshToken;
pub use user::User;

use serde::Serialize;

/// One page of a filtered query, newest entries first.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
