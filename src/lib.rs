// VendHub Auth Service Library

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod security;
pub mod services;

#[cfg(test)]
pub mod tests;

pub use error::{AuthError, Result};

// Re-export commonly used types
pub use models::{AuditLog, RefreshToken, User};

use std::sync::Arc;

use clock::Clock;
use security::TokenIssuer;
use services::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub issuer: Arc<TokenIssuer>,
    pub clock: Arc<dyn Clock>,
}
