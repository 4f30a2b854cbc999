//! Persistence seams.
//!
//! The auth core talks to storage through these traits; the `Pg*`
//! implementations back them with Postgres. Tests substitute in-memory
//! implementations.
pub mod audit_repo;
pub mod token_repo;
pub mod user_repo;

pub use audit_repo::PgAuditLogRepo;
pub use token_repo::PgRefreshTokenRepo;
pub use user_repo::PgAccountRepo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::audit_log::{AuditEvent, AuditLogFilter};
use crate::models::{AuditLog, Page, RefreshToken, User};

#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Zero the failure counter, clear any lock and stamp the login time.
    async fn record_login_success(&self, username: &str, now: DateTime<Utc>) -> Result<()>;

    /// Atomically increment the failure counter. Returns the new count, or
    /// `None` when the username does not exist.
    async fn record_login_failure(&self, username: &str) -> Result<Option<i32>>;

    async fn lock_until(&self, username: &str, until: DateTime<Utc>) -> Result<()>;

    /// Clear the lock and reset the failure counter.
    async fn clear_lock(&self, username: &str) -> Result<()>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;
}

#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn insert(&self, token: &RefreshToken) -> Result<()>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    async fn revoke(&self, id: Uuid) -> Result<()>;

    /// Returns the number of tokens revoked.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Returns the number of tokens deleted.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait AuditLogRepo: Send + Sync {
    /// Append one entry. The store assigns id and timestamp.
    async fn insert(&self, event: AuditEvent) -> Result<()>;

    /// Filtered page, timestamp descending.
    async fn find(&self, filter: &AuditLogFilter) -> Result<Page<AuditLog>>;

    /// Returns the number of entries deleted.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
