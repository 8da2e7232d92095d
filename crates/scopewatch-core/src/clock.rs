//! Time source and timestamp formatting
//!
//! The engine never reads the system clock directly; every instant comes
//! from a [`Clock`] so tests can drive time deterministically.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock with millisecond resolution
///
/// Shareable across threads; every reader observes the same instant until
/// it is advanced.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::at_epoch_millis(start.timestamp_millis())
    }

    /// Start the clock at the given number of milliseconds since the epoch
    pub fn at_epoch_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(to_millis_i64(by), Ordering::SeqCst);
    }

    /// Move the clock backward (simulates a wall-clock correction)
    pub fn rewind(&self, by: Duration) {
        self.millis.fetch_sub(to_millis_i64(by), Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch_millis(0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

fn to_millis_i64(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Elapsed time between two instants, truncated to whole milliseconds
///
/// Returns zero when `end` precedes `start`.
pub fn elapsed_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    u64::try_from((end - start).num_milliseconds())
        .map(Duration::from_millis)
        .unwrap_or(Duration::ZERO)
}

/// Render an instant as ISO-8601 UTC with millisecond precision
///
/// e.g. `2017-03-01T12:30:05.042+0000`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()
}

/// Render a duration as whole milliseconds
pub fn format_millis(d: Duration) -> String {
    d.as_millis().to_string()
}
