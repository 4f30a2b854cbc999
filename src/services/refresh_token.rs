/// Refresh token lifecycle
///
/// Refresh tokens are opaque 256-bit random strings; they mean nothing
/// without a store lookup. Only the SHA-256 digest is persisted, so a
/// leaked database dump cannot be replayed as live tokens. An account may
/// hold several live tokens at once (one per device).
use std::sync::Arc;

use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::RefreshTokenRepo;
use crate::error::{AuthError, Result};
use crate::models::RefreshToken;

pub struct RefreshTokenService {
    repo: Arc<dyn RefreshTokenRepo>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl RefreshTokenService {
    pub fn new(repo: Arc<dyn RefreshTokenRepo>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { repo, ttl, clock }
    }

    /// Issue a new token for the account and return the plaintext. The
    /// plaintext is never stored and cannot be recovered later.
    pub async fn create(&self, user_id: Uuid) -> Result<String> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plaintext = hex::encode(bytes);

        let now = self.clock.now();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(&plaintext),
            issued_at: now,
            expires_at: now + self.ttl,
            revoked: false,
        };
        self.repo.insert(&token).await?;

        Ok(plaintext)
    }

    /// Look up and validate a presented token. An expired token is deleted
    /// here as a side effect, so verifying it again reports not-found.
    pub async fn verify(&self, plaintext: &str) -> Result<RefreshToken> {
        let token = self
            .repo
            .find_by_hash(&hash_token(plaintext))
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if token.is_expired(self.clock.now()) {
            self.repo.delete(token.id).await?;
            return Err(AuthError::TokenExpired);
        }

        if token.revoked {
            return Err(AuthError::TokenRevoked);
        }

        Ok(token)
    }

    /// Revoke one token. Returns the revoked row.
    pub async fn revoke(&self, plaintext: &str) -> Result<RefreshToken> {
        let token = self
            .repo
            .find_by_hash(&hash_token(plaintext))
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        self.repo.revoke(token.id).await?;
        Ok(token)
    }

    /// Invalidate every token owned by the account. Required after a
    /// password change so pre-change sessions cannot mint new access
    /// tokens.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64> {
        self.repo.revoke_all_for_user(user_id).await
    }

    /// Batch-delete stale rows. Hygiene, not correctness: expired tokens
    /// already fail verification.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.repo.delete_expired(self.clock.now()).await
    }
}
