//! Frozen time.

use chrono::{DateTime, Utc};
use gatekeeper_core::clock::Clock;

/// Every call to `now` returns the wrapped instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
