use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => ([(CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response(),
        Err(err) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string(),
        )
            .into_response(),
    }
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help)
        .and_then(|counter| {
            prometheus::default_registry().register(Box::new(counter.clone()))?;
            Ok(counter)
        })
        .unwrap_or_else(|err| {
            tracing::error!("failed to register counter {name}: {err}");
            // Unregistered fallback so metric calls stay infallible.
            IntCounter::new(format!("{name}_unregistered"), help).expect("fallback counter")
        })
}

/// Counter for login attempts that reached the service (incremented before
/// any gate runs).
static LOGIN_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("login_requests_total", "Total number of login requests")
});

/// Counter for credential failures (unknown user, wrong password, disabled
/// account).
static LOGIN_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "login_failures_total",
        "Total number of failed login attempts",
    )
});

/// Counter for logins refused at the per-IP rate gate.
static RATE_LIMITED_LOGINS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "rate_limited_logins_total",
        "Total number of login requests refused by the rate limiter",
    )
});

/// Counter for account lockouts triggered by repeated failures.
static ACCOUNT_LOCKOUTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "account_lockouts_total",
        "Total number of account lockouts triggered",
    )
});

/// Counter for audit entries that could not be written. Audit writes are
/// fire-and-forget; this counter is the only caller-visible trace of a
/// failed write.
static AUDIT_WRITE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "audit_write_failures_total",
        "Total number of audit log entries dropped after a write failure",
    )
});

#[inline]
pub fn inc_login_requests() {
    LOGIN_REQUESTS_TOTAL.inc();
}

#[inline]
pub fn inc_login_failures() {
    LOGIN_FAILURES_TOTAL.inc();
}

#[inline]
pub fn inc_rate_limited_logins() {
    RATE_LIMITED_LOGINS_TOTAL.inc();
}

#[inline]
pub fn inc_account_lockouts() {
    ACCOUNT_LOCKOUTS_TOTAL.inc();
}

#[inline]
pub fn inc_audit_write_failures() {
    AUDIT_WRITE_FAILURES_TOTAL.inc();
}
