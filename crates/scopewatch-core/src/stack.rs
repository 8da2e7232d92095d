use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::errors::{AnomalyKind, StackAnomaly};
use crate::frame::{Lap, TimingFrame};

/// Ordered stack of timing frames for one execution context
///
/// Every read of the top frame is total: reading an empty stack pushes a
/// placeholder frame and records a `TopOnEmptyStack` anomaly. Popping an
/// empty stack is a no-op that records `PopOnEmptyStack`. Recorded anomalies
/// are buffered until the owner drains them with [`TimingStack::take_anomalies`].
#[derive(Debug, Clone, Default)]
pub struct TimingStack {
    frames: Vec<TimingFrame>,
    anomalies: Vec<StackAnomaly>,
}

/// What a `stop` observed on the top frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Present when the frame was running
    pub lap: Option<Lap>,
    pub target: Option<String>,
    pub operation: Option<String>,
}

impl TimingStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a fresh, stopped frame
    pub fn push(&mut self, operation: Option<String>, target: Option<String>) {
        self.frames.push(TimingFrame::new(operation, target));
    }

    /// Remove and return the top frame
    pub fn pop(&mut self) -> Option<TimingFrame> {
        let popped = self.frames.pop();
        if popped.is_none() {
            self.record(AnomalyKind::PopOnEmptyStack);
        }
        popped
    }

    /// The top frame, created on demand when the stack is empty
    pub fn top(&mut self) -> &mut TimingFrame {
        if self.frames.is_empty() {
            self.record(AnomalyKind::TopOnEmptyStack);
            self.frames.push(TimingFrame::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// The top frame without recovery
    pub fn peek(&self) -> Option<&TimingFrame> {
        self.frames.last()
    }

    /// Start the top frame; returns `true` on a stopped -> running transition
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        self.top().start(now)
    }

    /// Stop the top frame and report its identity
    pub fn stop(&mut self, now: DateTime<Utc>) -> StopReport {
        let frame = self.top();
        let lap = frame.stop(now);
        StopReport {
            lap,
            target: frame.target().map(str::to_owned),
            operation: frame.operation().map(str::to_owned),
        }
    }

    pub fn duration(&mut self) -> Duration {
        self.top().duration()
    }

    pub fn current_duration(&mut self, now: DateTime<Utc>) -> Duration {
        self.top().current_duration(now)
    }

    pub fn is_running(&mut self) -> bool {
        self.top().is_running()
    }

    pub fn top_target(&mut self) -> Option<String> {
        self.top().target().map(str::to_owned)
    }

    /// Drop every frame; buffered anomalies are kept
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Record an anomaly detected by a caller of the stack
    pub fn report(&mut self, anomaly: StackAnomaly) {
        self.anomalies.push(anomaly);
    }

    /// Drain anomalies recorded since the last call
    pub fn take_anomalies(&mut self) -> Vec<StackAnomaly> {
        std::mem::take(&mut self.anomalies)
    }

    fn record(&mut self, kind: AnomalyKind) {
        self.report(StackAnomaly::new(kind, self.frames.len()));
    }
}
