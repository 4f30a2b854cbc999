/// HTTP request handlers (REST API)
pub mod audit;
pub mod auth;

pub use audit::{cleanup_audit_logs, get_audit_logs, get_recent_audit_logs};
pub use auth::{
    change_password, login, logout, refresh_token, validate_token, AuthResponse, MessageResponse,
};
