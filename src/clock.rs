//! # Clock
//!
//! Injectable wall-clock seam. Lease expiration arithmetic and the
//! staleness check both read time through this trait so tests can pin
//! the clock to a fixed instant.

use chrono::Utc;

/// Source of the current wall-clock time in unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

/// System wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}
