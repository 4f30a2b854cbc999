/// Login orchestration
///
/// Composes the rate gate, the lockout state machine, credential
/// verification and token issuance into the login, refresh, logout and
/// change-password use cases. Every security-relevant outcome is recorded
/// on the audit trail off the critical path.
use std::sync::Arc;

use crate::clock::Clock;
use crate::db::AccountRepo;
use crate::error::{AuthError, Result};
use crate::metrics;
use crate::models::audit_log::{actions, actors, resources, AuditEvent};
use crate::models::User;
use crate::security::{password, LockoutTracker, LoginRateLimiter, TokenIssuer};
use crate::services::{AuditTrail, RefreshTokenService};

/// Request metadata used for auditing and the per-IP rate gate.
#[derive(Debug, Clone)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: Option<String>,
}

/// An established session: a signed access token plus the opaque refresh
/// token that can later be exchanged for a new one.
#[derive(Debug)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

pub struct AuthService {
    accounts: Arc<dyn AccountRepo>,
    refresh_tokens: Arc<RefreshTokenService>,
    issuer: Arc<TokenIssuer>,
    rate_limiter: Arc<LoginRateLimiter>,
    lockout: LockoutTracker,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        refresh_tokens: Arc<RefreshTokenService>,
        issuer: Arc<TokenIssuer>,
        rate_limiter: Arc<LoginRateLimiter>,
        lockout: LockoutTracker,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            refresh_tokens,
            issuer,
            rate_limiter,
            lockout,
            audit,
            clock,
        }
    }

    /// Authenticate a username/password pair from the given client.
    ///
    /// The rate gate runs before anything else: a refused request never
    /// reaches the credential check, so it costs no hashing work and leaks
    /// no timing signal about the account.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientMeta,
    ) -> Result<AuthSession> {
        metrics::inc_login_requests();

        if !self.rate_limiter.consume(&client.ip) {
            metrics::inc_rate_limited_logins();
            self.audit.record(
                AuditEvent::failure(actors::ANONYMOUS, actions::LOGIN_FAILED, "Too many login attempts")
                    .resource(resources::USER, username)
                    .details(format!("Rate limit exceeded from IP: {}", client.ip))
                    .client(Some(client.ip.clone()), client.user_agent.clone()),
            );
            return Err(AuthError::RateLimited);
        }

        let account = self.accounts.find_by_username(username).await?;

        if let Some(account) = &account {
            if self.lockout.is_locked(account).await? {
                self.audit.record(
                    AuditEvent::failure(actors::ANONYMOUS, actions::LOGIN_FAILED, "Account is locked")
                        .resource(resources::USER, username)
                        .details("Login attempt while account is locked")
                        .client(Some(client.ip.clone()), client.user_agent.clone()),
                );
                return Err(AuthError::AccountLocked);
            }
        }

        // One generic refusal for every credential failure; the audit row
        // keeps the precise cause.
        let account = match account {
            Some(account)
                if account.enabled
                    && password::verify_password(password, &account.password_hash).is_ok() =>
            {
                account
            }
            Some(account) => {
                let cause = if account.enabled {
                    "wrong password"
                } else {
                    "account disabled"
                };
                self.refuse_credentials(username, cause, client).await?;
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                self.refuse_credentials(username, "unknown username", client)
                    .await?;
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.lockout.on_success(username).await?;
        self.rate_limiter.reset(&client.ip);

        // Store failure past this point aborts the whole login: either
        // both tokens reach the caller or neither does.
        let refresh_token = self.refresh_tokens.create(account.id).await?;
        let access_token = self.issuer.issue(&account)?;

        self.audit.record(
            AuditEvent::success(account.username.clone(), actions::LOGIN)
                .resource(resources::USER, account.id.to_string())
                .details(format!("User logged in successfully from IP: {}", client.ip))
                .client(Some(client.ip.clone()), client.user_agent.clone()),
        );
        tracing::info!(username, "user logged in");

        Ok(AuthSession {
            access_token,
            refresh_token,
            username: account.username,
            email: account.email,
            roles: account.roles,
        })
    }

    /// Bookkeeping shared by every credential refusal: bump the lockout
    /// counter, count the failure and audit the precise cause.
    async fn refuse_credentials(
        &self,
        username: &str,
        cause: &str,
        client: &ClientMeta,
    ) -> Result<()> {
        self.lockout.on_failure(username).await?;
        metrics::inc_login_failures();
        self.audit.record(
            AuditEvent::failure(
                actors::ANONYMOUS,
                actions::LOGIN_FAILED,
                "Invalid username or password",
            )
            .resource(resources::USER, username)
            .details(format!("Failed login attempt: {cause}"))
            .client(Some(client.ip.clone()), client.user_agent.clone()),
        );

        Ok(())
    }

    /// Exchange a live refresh token for a fresh access token. The refresh
    /// token itself is returned unchanged; it is not rotated on use.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let token = self.refresh_tokens.verify(refresh_token).await?;

        // A token whose owner no longer exists is as good as absent.
        let account = self
            .accounts
            .find_by_id(token.user_id)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let access_token = self.issuer.issue(&account)?;

        Ok(AuthSession {
            access_token,
            refresh_token: refresh_token.to_string(),
            username: account.username,
            email: account.email,
            roles: account.roles,
        })
    }

    /// Revoke the presented refresh token. Access tokens already issued
    /// stay valid until they expire.
    pub async fn logout(&self, refresh_token: &str, client: &ClientMeta) -> Result<()> {
        let token = self.refresh_tokens.revoke(refresh_token).await?;

        let actor = match self.accounts.find_by_id(token.user_id).await? {
            Some(user) => user.username,
            None => actors::ANONYMOUS.to_string(),
        };
        self.audit.record(
            AuditEvent::success(actor, actions::LOGOUT)
                .resource(resources::USER, token.user_id.to_string())
                .details("User logged out successfully")
                .client(Some(client.ip.clone()), client.user_agent.clone()),
        );

        Ok(())
    }

    /// Replace the caller's password and invalidate every session
    /// established before the change.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
        client: &ClientMeta,
    ) -> Result<()> {
        if password::verify_password(current_password, &user.password_hash).is_err() {
            return Err(AuthError::PasswordMismatch);
        }

        let new_hash = password::hash_password(new_password)?;
        self.accounts
            .update_password(user.id, &new_hash, self.clock.now())
            .await?;

        let revoked = self.refresh_tokens.revoke_all(user.id).await?;
        self.audit.record(
            AuditEvent::success(user.username.clone(), actions::PASSWORD_CHANGED)
                .resource(resources::USER, user.id.to_string())
                .details(format!(
                    "User password changed successfully; {revoked} refresh token(s) revoked"
                ))
                .client(Some(client.ip.clone()), client.user_agent.clone()),
        );
        tracing::info!(username = %user.username, "password changed");

        Ok(())
    }

    /// Load the account behind an authenticated principal. A principal
    /// whose account has disappeared is treated as unauthenticated.
    pub async fn require_account(&self, username: &str) -> Result<User> {
        self.accounts
            .find_by_username(username)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }
}
