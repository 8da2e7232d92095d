use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::ScopewatchConfig;
use crate::context::ExecutionContext;
use crate::emitter::{EventEmitter, EventRecord};

/// Timing operations on the calling execution context
///
/// Every operation is total. Stack-discipline anomalies are reported to the
/// emitter as warnings after the context has been released, never returned.
#[derive(Clone)]
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    emitter: Arc<dyn EventEmitter>,
    config: Arc<ScopewatchConfig>,
}

impl Stopwatch {
    /// Stopwatch with default placeholders and instance identity
    pub fn new(clock: Arc<dyn Clock>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self::with_config(clock, emitter, Arc::new(ScopewatchConfig::default()))
    }

    pub fn with_config(
        clock: Arc<dyn Clock>,
        emitter: Arc<dyn EventEmitter>,
        config: Arc<ScopewatchConfig>,
    ) -> Self {
        Self {
            clock,
            emitter,
            config,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Push a stopped frame labelled with the operation and its target
    pub fn push(&self, operation: Option<&str>, target: Option<&str>) {
        self.within(|ctx, _| {
            ctx.stack_mut()
                .push(operation.map(str::to_owned), target.map(str::to_owned))
        });
    }

    pub fn pop(&self) {
        self.within(|ctx, _| {
            ctx.stack_mut().pop();
        });
    }

    pub fn start(&self) {
        self.within(|ctx, now| ctx.start(now));
    }

    pub fn stop(&self) {
        self.within(|ctx, now| {
            ctx.stop(now);
        });
    }

    pub fn push_and_start(&self, operation: Option<&str>, target: Option<&str>) {
        self.within(|ctx, now| {
            ctx.stack_mut()
                .push(operation.map(str::to_owned), target.map(str::to_owned));
            ctx.start(now);
        });
    }

    pub fn stop_and_pop(&self) {
        self.within(|ctx, now| {
            ctx.stop(now);
            ctx.stack_mut().pop();
        });
    }

    /// Discard every frame, then push and start a fresh root frame
    pub fn clear_and_start(&self) {
        self.within(|ctx, now| {
            ctx.stack_mut().clear();
            ctx.stack_mut().push(None, None);
            ctx.start(now);
        });
    }

    pub fn clear(&self) {
        self.within(|ctx, _| ctx.stack_mut().clear());
    }

    /// Accumulated time of the top frame
    pub fn duration(&self) -> Duration {
        self.within(|ctx, _| ctx.stack_mut().duration())
    }

    /// Live time since the top frame was last started
    pub fn current_duration(&self) -> Duration {
        self.within(|ctx, now| ctx.stack_mut().current_duration(now))
    }

    pub fn is_running(&self) -> bool {
        self.within(|ctx, _| ctx.stack_mut().is_running())
    }

    pub fn top_target(&self) -> Option<String> {
        self.within(|ctx, _| ctx.stack_mut().top_target())
    }

    pub fn is_empty(&self) -> bool {
        self.within(|ctx, _| ctx.stack().is_empty())
    }

    pub fn depth(&self) -> usize {
        self.within(|ctx, _| ctx.stack().depth())
    }

    /// Run `f` against the calling context, then report any anomalies it caused
    pub(crate) fn within<R>(&self, f: impl FnOnce(&mut ExecutionContext, DateTime<Utc>) -> R) -> R {
        let now = self.clock.now();
        let (result, anomalies, fields) = ExecutionContext::current(|ctx| {
            let result = f(ctx, now);
            let anomalies = ctx.stack_mut().take_anomalies();
            let fields = if anomalies.is_empty() {
                BTreeMap::new()
            } else {
                ctx.fields_mut().prepare(&self.config);
                ctx.fields().snapshot()
            };
            (result, anomalies, fields)
        });
        for anomaly in &anomalies {
            tracing::debug!(code = anomaly.code(), depth = anomaly.depth(), "timing stack anomaly");
            self.emitter
                .emit(&EventRecord::anomaly(anomaly, fields.clone()));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::emitter::RecordingEmitter;
    use crate::errors::AnomalyKind;
    use scopewatch_core_types::ContextKey;

    fn fixture() -> (Stopwatch, Arc<ManualClock>, RecordingEmitter) {
        let clock = Arc::new(ManualClock::at_epoch_millis(10_000));
        let emitter = RecordingEmitter::new();
        let stopwatch = Stopwatch::new(clock.clone(), Arc::new(emitter.clone()));
        (stopwatch, clock, emitter)
    }

    #[test]
    fn test_push_and_start_then_stop_and_pop() {
        ExecutionContext::sync_scope(|| {
            let (sw, clock, emitter) = fixture();
            sw.push_and_start(Some("svcA"), Some("hostX"));
            clock.advance(Duration::from_millis(75));
            assert_eq!(sw.current_duration(), Duration::from_millis(75));

            sw.stop_and_pop();

            assert!(sw.is_empty());
            let elapsed = ExecutionContext::current(|ctx| {
                ctx.fields().get(ContextKey::ElapsedTime).map(str::to_owned)
            });
            assert_eq!(elapsed.as_deref(), Some("75"));
            assert!(emitter.records().is_empty());
        });
    }

    #[test]
    fn test_read_on_empty_reports_once() {
        ExecutionContext::sync_scope(|| {
            let (sw, _, emitter) = fixture();
            assert_eq!(sw.duration(), Duration::ZERO);
            assert!(!sw.is_running());

            assert_eq!(emitter.anomaly_count(AnomalyKind::TopOnEmptyStack), 1);
            assert_eq!(sw.depth(), 1);
        });
    }

    #[test]
    fn test_clear_and_start_resets_depth() {
        ExecutionContext::sync_scope(|| {
            let (sw, _, _) = fixture();
            sw.push(None, None);
            sw.push(None, None);
            sw.clear_and_start();

            assert_eq!(sw.depth(), 1);
            assert!(sw.is_running());
        });
    }

    #[test]
    fn test_top_target() {
        ExecutionContext::sync_scope(|| {
            let (sw, _, _) = fixture();
            sw.push(Some("op"), Some("db-1"));
            assert_eq!(sw.top_target().as_deref(), Some("db-1"));
        });
    }
}
