/// VendHub Auth Service - Main entry point
///
/// Serves the authentication REST API and runs the background maintenance
/// tasks (audit writer, refresh-token purge, audit retention sweep).
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;

use vendhub_auth::{
    clock::SystemClock,
    config::Config,
    db::{PgAccountRepo, PgAuditLogRepo, PgRefreshTokenRepo},
    models::audit_log::{actions, actors, AuditEvent},
    routes::build_router,
    security::{LockoutTracker, LoginRateLimiter, TokenIssuer},
    services::{AuditTrail, AuthService, RefreshTokenService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vendhub_auth=info,info".into()),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration from environment")?;

    tracing::info!(
        "Starting VendHub Auth Service on {}:{}",
        config.server_host,
        config.server_port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database connection pool initialized");

    let clock = Arc::new(SystemClock);
    let accounts = Arc::new(PgAccountRepo::new(db_pool.clone()));
    let token_repo = Arc::new(PgRefreshTokenRepo::new(db_pool.clone()));
    let audit_repo = Arc::new(PgAuditLogRepo::new(db_pool.clone()));

    let issuer = Arc::new(TokenIssuer::new(
        &config.jwt_secret,
        config.access_token_ttl(),
        clock.clone(),
    ));
    let refresh_tokens = Arc::new(RefreshTokenService::new(
        token_repo,
        config.refresh_token_ttl(),
        clock.clone(),
    ));
    let rate_limiter = Arc::new(LoginRateLimiter::new(
        config.login_rate_limit,
        config.login_rate_window(),
        clock.clone(),
    ));
    let lockout = LockoutTracker::new(
        accounts.clone(),
        config.max_failed_login_attempts,
        config.lockout_duration(),
        clock.clone(),
    );
    let audit = AuditTrail::spawn(audit_repo);

    let auth = Arc::new(AuthService::new(
        accounts,
        refresh_tokens.clone(),
        issuer.clone(),
        rate_limiter,
        lockout,
        audit.clone(),
        clock.clone(),
    ));

    spawn_maintenance(
        refresh_tokens,
        audit.clone(),
        config.audit_retention_days,
        config.maintenance_interval_secs,
    );

    let state = AppState {
        auth,
        issuer,
        clock,
    };

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("Invalid server address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("REST API listening on {addr}");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server failed")?;

    // Drain queued audit events before exiting.
    audit.flush().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Periodic hygiene: purge expired refresh tokens and sweep audit entries
/// past the retention window.
fn spawn_maintenance(
    refresh_tokens: Arc<RefreshTokenService>,
    audit: AuditTrail,
    retention_days: i64,
    interval_secs: u64,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // The immediate first tick would run the sweep during startup.
        interval.tick().await;

        loop {
            interval.tick().await;

            match refresh_tokens.purge_expired().await {
                Ok(purged) if purged > 0 => {
                    tracing::info!(purged, "purged expired refresh tokens");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("refresh token purge failed: {err}"),
            }

            let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days);
            match audit.delete_older_than(cutoff).await {
                Ok(deleted) if deleted > 0 => {
                    tracing::info!(deleted, "removed audit log entries past retention");
                    audit.record(
                        AuditEvent::success(actors::SYSTEM, actions::RETENTION_SWEEP)
                            .details(format!("Removed {deleted} entries older than {cutoff}")),
                    );
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("audit retention sweep failed: {err}"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
}
