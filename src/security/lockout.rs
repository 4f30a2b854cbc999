/// Per-account failed-login lockout
///
/// Counts consecutive credential failures in the account row and locks the
/// account for a fixed duration once the threshold is reached. The lock is
/// never unwound by a background job: expiry is detected lazily on the
/// next access.
use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::db::AccountRepo;
use crate::error::Result;
use crate::metrics;
use crate::models::User;

pub struct LockoutTracker {
    accounts: Arc<dyn AccountRepo>,
    max_attempts: i32,
    lockout_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl LockoutTracker {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        max_attempts: i32,
        lockout_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            max_attempts,
            lockout_duration,
            clock,
        }
    }

    /// Reset the failure counter, clear any lock and stamp the login time.
    pub async fn on_success(&self, username: &str) -> Result<()> {
        self.accounts
            .record_login_success(username, self.clock.now())
            .await
    }

    /// Count one credential failure; lock the account once the threshold
    /// is reached. Unknown usernames are a silent no-op.
    pub async fn on_failure(&self, username: &str) -> Result<()> {
        let Some(attempts) = self.accounts.record_login_failure(username).await? else {
            return Ok(());
        };

        if attempts >= self.max_attempts {
            let until = self.clock.now() + self.lockout_duration;
            self.accounts.lock_until(username, until).await?;
            metrics::inc_account_lockouts();
            tracing::warn!(username, %until, "account locked after repeated login failures");
        }

        Ok(())
    }

    /// Whether the account is currently locked. A lock whose deadline has
    /// passed is cleared here, on access, and reported as unlocked.
    pub async fn is_locked(&self, user: &User) -> Result<bool> {
        let Some(locked_until) = user.locked_until else {
            return Ok(false);
        };

        if self.clock.now() > locked_until {
            self.accounts.clear_lock(&user.username).await?;
            return Ok(false);
        }

        Ok(true)
    }
}
