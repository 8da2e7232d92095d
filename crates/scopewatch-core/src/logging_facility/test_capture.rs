//! Test capture mode for deterministic logging assertions
//!
//! This module provides a test-only subscriber layer that captures tracing
//! events in memory for assertion in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::Visit;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use scopewatch_core_types::schema::{FIELD_ARGS, FIELD_CHANNEL, FIELD_CONTEXT, FIELD_EVENT};

/// A captured tracing event with all its fields
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub channel: Option<String>,
    pub event: Option<String>,
    /// Debug rendering of the record arguments
    pub args: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    /// The `context` field parsed back into a JSON object
    pub fn context(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let raw = self.fields.get(FIELD_CONTEXT)?;
        serde_json::from_str(raw).ok()
    }
}

struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

/// Test capture layer for collecting events
pub struct TestCaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let layer = Self {
            events: events.clone(),
        };
        let capture = TestCapture { events };
        (layer, capture)
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let captured = CapturedEvent {
            level: *metadata.level(),
            channel: visitor.fields.get(FIELD_CHANNEL).cloned(),
            event: visitor.fields.get(FIELD_EVENT).cloned(),
            args: visitor.fields.get(FIELD_ARGS).cloned(),
            fields: visitor.fields,
        };

        self.events
            .lock()
            .map(|mut events| events.push(captured))
            .ok();
    }
}

/// Handle for accessing captured events in tests
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// Get all captured events
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Assert that an event exists on the given channel with the given message id
    ///
    /// # Panics
    ///
    /// Panics if the event is not found
    pub fn assert_event_exists(&self, channel: &str, event: &str) {
        let events = self.events();
        let found = events.iter().any(|e| {
            e.channel.as_deref() == Some(channel) && e.event.as_deref() == Some(event)
        });
        assert!(
            found,
            "Expected event channel={} event={} not found in {} captured events",
            channel,
            event,
            events.len()
        );
    }

    /// Clear all captured events
    pub fn clear(&self) {
        self.events.lock().map(|mut e| e.clear()).ok();
    }

    /// Count events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Initialize process-wide test capture
///
/// Returns a shared global capture instance. Tests sharing the process
/// should filter events by a unique message id or field value.
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            if tracing_subscriber::registry().with(layer).try_init().is_err() {
                tracing::debug!("global subscriber already set; capture stays empty");
            }
            capture
        })
        .clone()
}

/// Capture events emitted by `f` on the current thread only
///
/// # Example
///
/// ```
/// use scopewatch_core::logging_facility::test_capture::with_test_capture;
///
/// let (_, capture) = with_test_capture(|| {
///     tracing::info!(channel = "audit", event = "AUDIT_END");
/// });
/// capture.assert_event_exists("audit", "AUDIT_END");
/// ```
pub fn with_test_capture<R>(f: impl FnOnce() -> R) -> (R, TestCapture) {
    let (layer, capture) = TestCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture)
}
