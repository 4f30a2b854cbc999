/// Security building blocks: password hashing, access tokens, the login
/// rate gate and the per-account lockout state machine.
pub mod jwt;
pub mod lockout;
pub mod password;
pub mod rate_limit;

pub use jwt::{AccessClaims, TokenIssuer, TokenValidationError};
pub use lockout::LockoutTracker;
pub use password::{hash_password, verify_password};
pub use rate_limit::LoginRateLimiter;
