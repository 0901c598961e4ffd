use chrono::{DateTime, Utc};
use std::time::Instant;

/// Monotonic clock abstraction, injected so pipeline/session timing is
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
    fn monotonic(&self) -> Instant;
}

/// Real wall-clock implementation used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}
