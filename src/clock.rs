/// Clock abstraction for time-dependent logic
///
/// Expiry checks (lockout, tokens, rate-limit windows) read time through an
/// injected clock so tests can drive them deterministically.
use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
