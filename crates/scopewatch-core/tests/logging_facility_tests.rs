#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scopewatch_core::logging_facility::{with_test_capture, CapturedEvent};
use scopewatch_core::{
    ExecutionContext, ManualClock, ScopeCoordinator, ScopeOutcome, ScopewatchConfig,
    TracingEmitter,
};
use scopewatch_core_types::ContextKey;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Reads the ambient request id on every event, like a field-enriching layer
struct RequestIdLayer {
    seen: Arc<Mutex<Vec<Option<String>>>>,
}

impl<S: Subscriber> Layer<S> for RequestIdLayer {
    fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let request_id = ExecutionContext::current(|ctx| {
            ctx.fields().get(ContextKey::RequestId).map(str::to_owned)
        });
        self.seen.lock().unwrap().push(request_id);
    }
}

fn tracing_scopes(clock: Arc<ManualClock>) -> ScopeCoordinator {
    ScopeCoordinator::new(clock, Arc::new(TracingEmitter), ScopewatchConfig::default())
}

fn is_event(event: &CapturedEvent, channel: &str, message: &str) -> bool {
    event.channel.as_deref() == Some(channel) && event.event.as_deref() == Some(message)
}

#[test]
fn test_scope_records_reach_tracing_with_context_json() {
    let clock = Arc::new(ManualClock::at_epoch_millis(1_488_326_400_000));
    let scopes = tracing_scopes(clock.clone());

    let (_, capture) = with_test_capture(|| {
        ExecutionContext::sync_scope(|| {
            scopes.set_log_context("req-9", "inst-9");
            scopes.begin_audit();
            scopes.begin_metric_for("svcA", "hostX");
            clock.advance(Duration::from_millis(12));
            scopes.end_metric(ScopeOutcome::complete());
            scopes.end_audit(ScopeOutcome::complete());
        })
    });

    capture.assert_event_exists("audit", "AUDIT_BEGIN");
    capture.assert_event_exists("metrics", "METRICS_BEGIN");
    capture.assert_event_exists("metrics", "METRICS_END");
    capture.assert_event_exists("audit", "AUDIT_END");

    let metric_end = capture
        .events()
        .into_iter()
        .find(|e| is_event(e, "metrics", "METRICS_END"))
        .unwrap();
    assert_eq!(metric_end.level, Level::INFO);

    let context = metric_end.context().unwrap();
    assert_eq!(context["RequestId"], "req-9");
    assert_eq!(context["TargetEntity"], "hostX");
    assert_eq!(context["TargetServiceName"], "svcA");
    assert_eq!(context["ElapsedTime"], "12");
}

#[test]
fn test_anomalies_reach_tracing_as_warnings() {
    let scopes = tracing_scopes(Arc::new(ManualClock::default()));

    let (_, capture) = with_test_capture(|| {
        ExecutionContext::sync_scope(|| {
            scopes.stopwatch().pop();
            scopes.begin_audit();
            scopes.begin_metric();
            scopes.end_audit(ScopeOutcome::complete());
        })
    });

    capture.assert_event_exists("error", "LOGGER_POP_ON_EMPTY_STACK");
    capture.assert_event_exists("error", "LOGGER_NON_EMPTY_STACK");

    let warnings = capture.count_events(|e| e.level == Level::WARN);
    assert_eq!(warnings, 2);

    let non_empty = capture
        .events()
        .into_iter()
        .find(|e| is_event(e, "error", "LOGGER_NON_EMPTY_STACK"))
        .unwrap();
    assert_eq!(non_empty.args.as_deref(), Some(r#"["1"]"#));
}

#[test]
fn test_capture_is_scoped_to_closure() {
    let scopes = tracing_scopes(Arc::new(ManualClock::default()));

    let (_, capture) = with_test_capture(|| {
        ExecutionContext::sync_scope(|| scopes.begin_audit())
    });
    ExecutionContext::sync_scope(|| scopes.begin_audit());

    assert_eq!(
        capture.count_events(|e| is_event(e, "audit", "AUDIT_BEGIN")),
        1
    );
}

#[test]
fn test_layer_reading_context_sees_live_fields_during_anomalies() {
    // GIVEN a subscriber layer that reads the ambient context on every event
    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(RequestIdLayer { seen: seen.clone() });
    let scopes = tracing_scopes(Arc::new(ManualClock::default()));

    // WHEN anomalies and scope records are emitted
    tracing::subscriber::with_default(subscriber, || {
        ExecutionContext::sync_scope(|| {
            scopes.set_request_id("req-7");
            scopes.stopwatch().pop();
            scopes.stopwatch().duration();
            scopes.begin_audit();
            scopes.begin_metric();
            scopes.end_audit(ScopeOutcome::complete());
        })
    });

    // THEN no event fired while the context was borrowed
    let seen = seen.lock().unwrap();
    assert!(seen.len() >= 5, "only {} events", seen.len());
    assert!(seen.iter().all(|id| id.as_deref() == Some("req-7")), "{seen:?}");
}
