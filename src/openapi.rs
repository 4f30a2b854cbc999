use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::auth::{AuthResponse, MessageResponse};
use crate::models::user::{ChangePasswordRequest, LoginRequest, RefreshTokenRequest};
use crate::models::AuditLog;

/// OpenAPI document covering the REST endpoints this service exposes.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::logout,
        crate::handlers::auth::change_password,
        crate::handlers::auth::validate_token,
        crate::handlers::audit::get_audit_logs,
        crate::handlers::audit::get_recent_audit_logs,
        crate::handlers::audit::cleanup_audit_logs
    ),
    components(schemas(
        LoginRequest,
        RefreshTokenRequest,
        ChangePasswordRequest,
        AuthResponse,
        MessageResponse,
        AuditLog
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication & token APIs"),
        (name = "Audit", description = "Security audit trail (admin)")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
