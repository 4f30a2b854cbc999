/// Unit tests for the auth core (no database required)
///
/// Lockout, refresh-token lifecycle and the login orchestration are
/// exercised end to end against in-memory stores with a manual clock.
use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::models::audit_log::{actions, actors};
use crate::security::LockoutTracker;
use crate::services::{AuditTrail, AuthService, RefreshTokenService};
use crate::tests::fixtures::*;

// ============================================================================
// Lockout state machine
// ============================================================================

fn lockout_over(
    accounts: Arc<MemoryAccountRepo>,
    clock: Arc<ManualClock>,
    max_attempts: i32,
) -> LockoutTracker {
    LockoutTracker::new(accounts, max_attempts, Duration::minutes(30), clock)
}

#[tokio::test]
async fn test_lockout_after_max_failures() {
    let accounts = Arc::new(MemoryAccountRepo::default());
    let clock = Arc::new(ManualClock::default());
    accounts.insert(test_user("alice", TEST_PASSWORD));
    let lockout = lockout_over(accounts.clone(), clock, 5);

    for _ in 0..4 {
        lockout.on_failure("alice").await.unwrap();
    }
    let user = accounts.get("alice").unwrap();
    assert!(user.locked_until.is_none(), "not locked below the threshold");

    lockout.on_failure("alice").await.unwrap();
    let user = accounts.get("alice").unwrap();
    assert_eq!(user.failed_login_attempts, 5);
    assert!(user.locked_until.is_some());
    assert!(lockout.is_locked(&user).await.unwrap());
}

#[tokio::test]
async fn test_lock_expires_and_resets_counter_on_next_access() {
    let accounts = Arc::new(MemoryAccountRepo::default());
    let clock = Arc::new(ManualClock::default());
    accounts.insert(test_user("alice", TEST_PASSWORD));
    let lockout = lockout_over(accounts.clone(), clock.clone(), 5);

    for _ in 0..5 {
        lockout.on_failure("alice").await.unwrap();
    }
    let user = accounts.get("alice").unwrap();
    assert!(lockout.is_locked(&user).await.unwrap());

    // The lock clears lazily, on the first check after the deadline.
    clock.advance(Duration::minutes(31));
    let user = accounts.get("alice").unwrap();
    assert!(!lockout.is_locked(&user).await.unwrap());

    let user = accounts.get("alice").unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
}

#[tokio::test]
async fn test_success_clears_lock_from_any_state() {
    let accounts = Arc::new(MemoryAccountRepo::default());
    let clock = Arc::new(ManualClock::default());
    accounts.insert(test_user("alice", TEST_PASSWORD));
    let lockout = lockout_over(accounts.clone(), clock.clone(), 3);

    for _ in 0..3 {
        lockout.on_failure("alice").await.unwrap();
    }
    lockout.on_success("alice").await.unwrap();

    let user = accounts.get("alice").unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
    assert_eq!(user.last_login_at, Some(clock.now()));
}

#[tokio::test]
async fn test_failure_for_unknown_username_is_a_noop() {
    let accounts = Arc::new(MemoryAccountRepo::default());
    let clock = Arc::new(ManualClock::default());
    let lockout = lockout_over(accounts.clone(), clock, 5);

    lockout.on_failure("ghost").await.unwrap();
    assert!(accounts.get("ghost").is_none());
}

// ============================================================================
// Refresh token lifecycle
// ============================================================================

fn refresh_service(
    repo: Arc<MemoryRefreshTokenRepo>,
    clock: Arc<ManualClock>,
) -> RefreshTokenService {
    RefreshTokenService::new(repo, Duration::days(7), clock)
}

#[tokio::test]
async fn test_create_then_verify_binds_token_to_account() {
    let repo = Arc::new(MemoryRefreshTokenRepo::default());
    let clock = Arc::new(ManualClock::default());
    let service = refresh_service(repo, clock);
    let user = test_user("alice", TEST_PASSWORD);

    let plaintext = service.create(user.id).await.unwrap();
    assert_eq!(plaintext.len(), 64, "expected 32 random bytes hex-encoded");

    let token = service.verify(&plaintext).await.unwrap();
    assert_eq!(token.user_id, user.id);
}

#[tokio::test]
async fn test_verify_unknown_token() {
    let repo = Arc::new(MemoryRefreshTokenRepo::default());
    let clock = Arc::new(ManualClock::default());
    let service = refresh_service(repo, clock);

    let result = service.verify("deadbeef").await;
    assert!(matches!(result, Err(AuthError::TokenNotFound)));
}

#[tokio::test]
async fn test_revoked_token_fails_verification() {
    let repo = Arc::new(MemoryRefreshTokenRepo::default());
    let clock = Arc::new(ManualClock::default());
    let service = refresh_service(repo, clock);
    let user = test_user("alice", TEST_PASSWORD);

    let plaintext = service.create(user.id).await.unwrap();
    service.revoke(&plaintext).await.unwrap();

    let result = service.verify(&plaintext).await;
    assert!(matches!(result, Err(AuthError::TokenRevoked)));
}

#[tokio::test]
async fn test_expired_token_is_deleted_on_first_verify() {
    let repo = Arc::new(MemoryRefreshTokenRepo::default());
    let clock = Arc::new(ManualClock::default());
    let service = refresh_service(repo.clone(), clock.clone());
    let user = test_user("alice", TEST_PASSWORD);

    let plaintext = service.create(user.id).await.unwrap();
    clock.advance(Duration::days(8));

    // First verify reports the expiry and removes the row...
    let result = service.verify(&plaintext).await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
    assert_eq!(repo.count(), 0);

    // ...so a second verify cannot tell the token ever existed.
    let result = service.verify(&plaintext).await;
    assert!(matches!(result, Err(AuthError::TokenNotFound)));
}

#[tokio::test]
async fn test_revoke_all_only_touches_one_account() {
    let repo = Arc::new(MemoryRefreshTokenRepo::default());
    let clock = Arc::new(ManualClock::default());
    let service = refresh_service(repo, clock);
    let alice = test_user("alice", TEST_PASSWORD);
    let bob = test_user("bob", TEST_PASSWORD);

    let alice_first = service.create(alice.id).await.unwrap();
    let alice_second = service.create(alice.id).await.unwrap();
    let bob_token = service.create(bob.id).await.unwrap();

    let revoked = service.revoke_all(alice.id).await.unwrap();
    assert_eq!(revoked, 2);

    assert!(matches!(
        service.verify(&alice_first).await,
        Err(AuthError::TokenRevoked)
    ));
    assert!(matches!(
        service.verify(&alice_second).await,
        Err(AuthError::TokenRevoked)
    ));
    assert!(service.verify(&bob_token).await.is_ok());
}

#[tokio::test]
async fn test_purge_expired_removes_only_stale_rows() {
    let repo = Arc::new(MemoryRefreshTokenRepo::default());
    let clock = Arc::new(ManualClock::default());
    let service = refresh_service(repo.clone(), clock.clone());
    let user = test_user("alice", TEST_PASSWORD);

    let stale = service.create(user.id).await.unwrap();
    clock.advance(Duration::days(4));
    let fresh = service.create(user.id).await.unwrap();
    clock.advance(Duration::days(4)); // stale is now 8 days old, fresh 4

    let purged = service.purge_expired().await.unwrap();
    assert_eq!(purged, 1);
    assert!(matches!(
        service.verify(&stale).await,
        Err(AuthError::TokenNotFound)
    ));
    assert!(service.verify(&fresh).await.is_ok());
}

// ============================================================================
// Login orchestration
// ============================================================================

#[tokio::test]
async fn test_login_success_returns_both_tokens() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    assert_eq!(session.username, "alice");
    assert_eq!(session.email, "alice@example.com");
    assert!(!session.roles.is_empty());

    // The access token is self-contained and verifiable offline.
    let claims = harness.issuer.validate(&session.access_token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.roles, session.roles);

    // The refresh token is opaque and only means something to the store.
    assert_eq!(harness.token_repo.count(), 1);

    harness.audit.flush().await;
    let entries = harness.audit_repo.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, actions::LOGIN);
    assert_eq!(entries[0].username, "alice");
    assert_eq!(entries[0].ip_address.as_deref(), Some(TEST_IP));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_identical() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let wrong_password = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await
        .unwrap_err();
    let unknown_user = harness
        .auth
        .login("ghost", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap_err();

    // One generic refusal, regardless of the internal cause.
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());

    // The audit trail still records which was which.
    harness.audit.flush().await;
    let entries = harness.audit_repo.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0]
        .details
        .as_deref()
        .unwrap()
        .contains("wrong password"));
    assert!(entries[1]
        .details
        .as_deref()
        .unwrap()
        .contains("unknown username"));
    assert!(entries.iter().all(|e| e.username == actors::ANONYMOUS));
}

#[tokio::test]
async fn test_disabled_account_fails_like_bad_credentials() {
    let harness = build_harness(HarnessConfig::default());
    let mut user = test_user("alice", TEST_PASSWORD);
    user.enabled = false;
    harness.accounts.insert(user);

    let result = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_correct_password_on_locked_account_is_refused() {
    // Wide-open rate limit so only the lockout gate is in play.
    let harness = build_harness(HarnessConfig {
        rate_capacity: 100,
        ..HarnessConfig::default()
    });
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    for _ in 0..5 {
        let result = harness
            .auth
            .login("alice", "WrongPass123!", &client(TEST_IP))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    // Sixth attempt carries the right password but arrives on a locked
    // account: it must not succeed.
    let result = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await;
    assert!(matches!(result, Err(AuthError::AccountLocked)));
}

#[tokio::test]
async fn test_lock_expiry_allows_login_again() {
    let harness = build_harness(HarnessConfig {
        rate_capacity: 100,
        lockout_secs: 30 * 60,
        ..HarnessConfig::default()
    });
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    for _ in 0..5 {
        let _ = harness
            .auth
            .login("alice", "WrongPass123!", &client(TEST_IP))
            .await;
    }
    assert!(matches!(
        harness
            .auth
            .login("alice", TEST_PASSWORD, &client(TEST_IP))
            .await,
        Err(AuthError::AccountLocked)
    ));

    harness.clock.advance(Duration::minutes(31));
    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();
    assert_eq!(session.username, "alice");

    let user = harness.accounts.get("alice").unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
}

#[tokio::test]
async fn test_rate_gate_refuses_sixth_attempt_before_credentials() {
    // 10.0.0.5 sends six wrong-password attempts inside one window at a
    // limit of 5/60s.
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    for _ in 0..5 {
        let result = harness
            .auth
            .login("alice", "WrongPass123!", &client(TEST_IP))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    let result = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await;
    assert!(matches!(result, Err(AuthError::RateLimited)));

    // The sixth attempt never reached the credential check: the failure
    // counter stopped at five.
    let user = harness.accounts.get("alice").unwrap();
    assert_eq!(user.failed_login_attempts, 5);

    harness.audit.flush().await;
    let entries = harness.audit_repo.entries();
    let credential_failures = entries
        .iter()
        .filter(|e| {
            e.error_message.as_deref() == Some("Invalid username or password")
                && e.ip_address.as_deref() == Some(TEST_IP)
        })
        .count();
    let rate_limited = entries
        .iter()
        .filter(|e| {
            e.error_message.as_deref() == Some("Too many login attempts")
                && e.ip_address.as_deref() == Some(TEST_IP)
        })
        .count();
    assert_eq!(credential_failures, 5);
    assert_eq!(rate_limited, 1);
}

#[tokio::test]
async fn test_successful_login_resets_rate_limit_for_ip() {
    let harness = build_harness(HarnessConfig {
        rate_capacity: 3,
        ..HarnessConfig::default()
    });
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let _ = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await;
    let _ = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await;
    harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    // The success forgave the bucket: three more attempts fit in the
    // same window.
    for _ in 0..3 {
        let result = harness
            .auth
            .login("alice", "WrongPass123!", &client(TEST_IP))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
    let result = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await;
    assert!(matches!(result, Err(AuthError::RateLimited)));
}

// ============================================================================
// Refresh / logout / change-password flows
// ============================================================================

#[tokio::test]
async fn test_refresh_mints_new_access_token_and_echoes_refresh_token() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    let refreshed = harness.auth.refresh(&session.refresh_token).await.unwrap();

    // No rotation: the refresh token comes back unchanged.
    assert_eq!(refreshed.refresh_token, session.refresh_token);
    assert_ne!(refreshed.access_token, session.access_token);

    let claims = harness.issuer.validate(&refreshed.access_token).unwrap();
    assert_eq!(claims.sub, "alice");
}

#[tokio::test]
async fn test_refresh_reflects_current_roles() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    // Promote the account between login and refresh.
    let mut user = harness.accounts.get("alice").unwrap();
    user.roles = vec!["ADMIN".to_string()];
    harness.accounts.insert(user);

    let refreshed = harness.auth.refresh(&session.refresh_token).await.unwrap();
    let claims = harness.issuer.validate(&refreshed.access_token).unwrap();
    assert_eq!(claims.roles, vec!["ADMIN".to_string()]);
}

#[tokio::test]
async fn test_refresh_after_ttl_reports_expiry_then_not_found() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    harness.clock.advance(Duration::days(8));
    assert!(matches!(
        harness.auth.refresh(&session.refresh_token).await,
        Err(AuthError::TokenExpired)
    ));
    assert!(matches!(
        harness.auth.refresh(&session.refresh_token).await,
        Err(AuthError::TokenNotFound)
    ));
}

#[tokio::test]
async fn test_logout_revokes_refresh_token_and_audits() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    harness
        .auth
        .logout(&session.refresh_token, &client(TEST_IP))
        .await
        .unwrap();

    assert!(matches!(
        harness.auth.refresh(&session.refresh_token).await,
        Err(AuthError::TokenRevoked)
    ));

    harness.audit.flush().await;
    let entries = harness.audit_repo.entries();
    let logout = entries
        .iter()
        .find(|e| e.action == actions::LOGOUT)
        .expect("logout entry");
    assert_eq!(logout.username, "alice");
}

#[tokio::test]
async fn test_change_password_invalidates_pre_change_sessions() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    let account = harness.accounts.get("alice").unwrap();
    harness
        .auth
        .change_password(&account, TEST_PASSWORD, "BrandNewPass456!", &client(TEST_IP))
        .await
        .unwrap();

    // The pre-change refresh token can no longer mint access tokens.
    assert!(matches!(
        harness.auth.refresh(&session.refresh_token).await,
        Err(AuthError::TokenRevoked)
    ));

    // The new password works; the old one does not.
    assert!(matches!(
        harness
            .auth
            .login("alice", TEST_PASSWORD, &client("10.0.0.9"))
            .await,
        Err(AuthError::InvalidCredentials)
    ));
    harness
        .auth
        .login("alice", "BrandNewPass456!", &client("10.0.0.9"))
        .await
        .unwrap();

    harness.audit.flush().await;
    let entries = harness.audit_repo.entries();
    assert!(entries
        .iter()
        .any(|e| e.action == actions::PASSWORD_CHANGED && e.username == "alice"));
}

#[tokio::test]
async fn test_change_password_with_wrong_current_password() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    let session = harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();

    let account = harness.accounts.get("alice").unwrap();
    let result = harness
        .auth
        .change_password(&account, "WrongPass123!", "BrandNewPass456!", &client(TEST_IP))
        .await;
    assert!(matches!(result, Err(AuthError::PasswordMismatch)));

    // Nothing was revoked on the failed attempt.
    assert!(harness.auth.refresh(&session.refresh_token).await.is_ok());
}

// ============================================================================
// Audit trail
// ============================================================================

#[tokio::test]
async fn test_audit_queries_filter_and_order_by_time_descending() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));
    harness.accounts.insert(test_user("bob", TEST_PASSWORD));

    harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();
    harness.clock.advance(Duration::minutes(1));
    harness
        .auth
        .login("bob", TEST_PASSWORD, &client("10.0.0.6"))
        .await
        .unwrap();
    harness.clock.advance(Duration::minutes(1));
    let _ = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await;
    harness.audit.flush().await;

    let all = harness
        .audit
        .find(&crate::models::audit_log::AuditLogFilter {
            page: 0,
            per_page: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    // Newest first.
    assert_eq!(all.items[0].action, actions::LOGIN_FAILED);
    assert_eq!(all.items[2].username, "alice");

    let alice_only = harness
        .audit
        .find(&crate::models::audit_log::AuditLogFilter {
            username: Some("alice".to_string()),
            page: 0,
            per_page: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(alice_only.total, 1, "failed logins are recorded as anonymous");

    let failures = harness
        .audit
        .find(&crate::models::audit_log::AuditLogFilter {
            action: Some(actions::LOGIN_FAILED.to_string()),
            page: 0,
            per_page: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(failures.total, 1);

    let recent_window = harness
        .audit
        .find(&crate::models::audit_log::AuditLogFilter {
            from: Some(harness.clock.now() - Duration::seconds(90)),
            page: 0,
            per_page: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(recent_window.total, 2);
}

#[tokio::test]
async fn test_audit_retention_sweep_deletes_and_counts() {
    let harness = build_harness(HarnessConfig::default());
    harness.accounts.insert(test_user("alice", TEST_PASSWORD));

    harness
        .auth
        .login("alice", TEST_PASSWORD, &client(TEST_IP))
        .await
        .unwrap();
    harness.clock.advance(Duration::days(100));
    let _ = harness
        .auth
        .login("alice", "WrongPass123!", &client(TEST_IP))
        .await;
    harness.audit.flush().await;

    let cutoff = harness.clock.now() - Duration::days(90);
    let deleted = harness.audit.delete_older_than(cutoff).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(harness.audit_repo.entries().len(), 1);
}

#[tokio::test]
async fn test_audit_write_failure_never_fails_the_login() {
    // Same wiring as the harness, but every audit write errors out.
    let clock = Arc::new(ManualClock::default());
    let accounts = Arc::new(MemoryAccountRepo::default());
    let token_repo = Arc::new(MemoryRefreshTokenRepo::default());
    let audit = AuditTrail::spawn(Arc::new(FailingAuditLogRepo));

    let issuer = Arc::new(crate::security::TokenIssuer::new(
        "test-secret",
        Duration::seconds(900),
        clock.clone(),
    ));
    let refresh_tokens = Arc::new(RefreshTokenService::new(
        token_repo,
        Duration::days(7),
        clock.clone(),
    ));
    let rate_limiter = Arc::new(crate::security::LoginRateLimiter::new(
        5,
        Duration::seconds(60),
        clock.clone(),
    ));
    let lockout = LockoutTracker::new(accounts.clone(), 5, Duration::minutes(30), clock.clone());
    let auth = AuthService::new(
        accounts.clone(),
        refresh_tokens,
        issuer,
        rate_limiter,
        lockout,
        audit.clone(),
        clock,
    );

    accounts.insert(test_user("alice", TEST_PASSWORD));
    let session = auth.login("alice", TEST_PASSWORD, &client(TEST_IP)).await;
    assert!(session.is_ok(), "audit failures must stay off the critical path");
    audit.flush().await;
}
