/// Access token issuing and validation
///
/// Access tokens are self-contained HS256 JWTs carrying the subject, its
/// roles and the expiry. There is no revocation list: once issued, a token
/// stays valid until it expires, which is why the TTL is short. Only
/// refresh tokens are revocable.
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AuthError, Result};
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username of the authenticated account.
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            clock,
        }
    }

    /// Mint a signed access token for the given account.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: user.username.clone(),
            roles: user.roles.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::Internal("Failed to generate access token".to_string()))
    }

    /// Decode and verify a token, returning its claims.
    pub fn validate(&self, token: &str) -> std::result::Result<AccessClaims, TokenValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below, not the
        // library's view of system time.
        validation.validate_exp = false;

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::BadSignature,
                ErrorKind::ExpiredSignature => TokenValidationError::Expired,
                _ => TokenValidationError::Malformed,
            },
        )?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(TokenValidationError::Expired);
        }

        Ok(data.claims)
    }
}
