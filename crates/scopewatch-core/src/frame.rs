use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::clock::elapsed_between;

/// One nested timed operation
///
/// A frame is running exactly when it holds a start instant. Accumulated
/// time only grows, and only on a running -> stopped transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingFrame {
    accumulated: Duration,
    started_at: Option<DateTime<Utc>>,
    target: Option<String>,
    operation: Option<String>,
}

/// Result of a running -> stopped transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lap {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// Accumulated total after this lap
    pub total: Duration,
}

impl TimingFrame {
    /// Create a stopped frame with zero accumulated time
    pub fn new(operation: Option<String>, target: Option<String>) -> Self {
        Self {
            accumulated: Duration::ZERO,
            started_at: None,
            target,
            operation,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Accumulated time over all completed start/stop pairs
    pub fn duration(&self) -> Duration {
        self.accumulated
    }

    /// Time since the last start, or zero when stopped
    pub fn current_duration(&self, now: DateTime<Utc>) -> Duration {
        self.started_at
            .map(|start| elapsed_between(start, now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Start the frame unless it is already running
    ///
    /// Returns `true` if this call performed the transition.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Stop the frame if running, folding the lap into the accumulated total
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Lap> {
        let started_at = self.started_at.take()?;
        self.accumulated += elapsed_between(started_at, now);
        Some(Lap {
            started_at,
            stopped_at: now,
            total: self.accumulated,
        })
    }
}
