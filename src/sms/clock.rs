//! Time source for session expiry

use super::state::ist;
use chrono::{DateTime, FixedOffset, Utc};

/// Current time in the fixed UTC+05:30 offset
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&ist())
    }
}

#[cfg(test)]
pub use manual::ManualClock;
