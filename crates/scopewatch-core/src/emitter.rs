//! Structured log sink consumed by the timing engine
//!
//! The engine decides when a record is emitted and which ambient fields it
//! carries; rendering is up to the [`EventEmitter`] implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::Level;

use scopewatch_core_types::ContextKey;

use crate::errors::{AnomalyKind, StackAnomaly};

/// Named log stream a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Audit,
    Metric,
    Error,
    Debug,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Audit => "audit",
            Channel::Metric => "metrics",
            Channel::Error => "error",
            Channel::Debug => "debug",
        }
    }
}

/// One record handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub level: Level,
    pub channel: Channel,
    /// Message identifier, e.g. `AUDIT_END`
    pub message: String,
    /// Context store snapshot taken at emission time
    pub fields: BTreeMap<ContextKey, String>,
    pub args: Vec<String>,
}

impl EventRecord {
    pub fn field(&self, key: ContextKey) -> Option<&str> {
        self.fields.get(&key).map(String::as_str)
    }

    /// Warning record reporting a stack-discipline anomaly
    pub fn anomaly(anomaly: &StackAnomaly, fields: BTreeMap<ContextKey, String>) -> Self {
        Self {
            level: Level::WARN,
            channel: Channel::Error,
            message: anomaly.code().to_owned(),
            fields,
            args: vec![anomaly.depth().to_string()],
        }
    }

    /// The anomaly this record reports, if any
    pub fn anomaly_kind(&self) -> Option<AnomalyKind> {
        if self.channel != Channel::Error {
            return None;
        }
        AnomalyKind::from_code(&self.message)
    }
}

/// Structured log sink
pub trait EventEmitter: Send + Sync {
    fn emit(&self, record: &EventRecord);
}

/// Forwards records to `tracing`
///
/// Records carry `channel`, `event`, `context` and `args` fields; the
/// context snapshot is rendered as one JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

macro_rules! forward {
    ($level:ident, $record:expr, $context:expr) => {
        tracing::$level!(
            target: "scopewatch",
            channel = $record.channel.as_str(),
            event = $record.message.as_str(),
            context = %$context,
            args = ?$record.args,
        )
    };
}

impl EventEmitter for TracingEmitter {
    fn emit(&self, record: &EventRecord) {
        let context = serde_json::to_string(&record.fields).unwrap_or_default();
        if record.level == Level::ERROR {
            forward!(error, record, context);
        } else if record.level == Level::WARN {
            forward!(warn, record, context);
        } else if record.level == Level::INFO {
            forward!(info, record, context);
        } else if record.level == Level::DEBUG {
            forward!(debug, record, context);
        } else {
            forward!(trace, record, context);
        }
    }
}

/// Keeps every record in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&EventRecord) -> bool,
    {
        self.records().iter().filter(|r| predicate(r)).count()
    }

    /// Number of reports of the given anomaly
    pub fn anomaly_count(&self, kind: AnomalyKind) -> usize {
        self.count(|r| r.anomaly_kind() == Some(kind))
    }

    /// Most recent record on the channel
    pub fn last_on(&self, channel: Channel) -> Option<EventRecord> {
        self.records()
            .into_iter()
            .rev()
            .find(|r| r.channel == channel)
    }

    pub fn clear(&self) {
        self.records.lock().map(|mut r| r.clear()).ok();
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, record: &EventRecord) {
        self.records
            .lock()
            .map(|mut records| records.push(record.clone()))
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(channel: Channel, message: &str) -> EventRecord {
        EventRecord {
            level: Level::INFO,
            channel,
            message: message.to_string(),
            fields: BTreeMap::new(),
            args: Vec::new(),
        }
    }

    #[test]
    fn test_recording_emitter_shares_buffer_between_clones() {
        let emitter = RecordingEmitter::new();
        let clone = emitter.clone();
        clone.emit(&record(Channel::Audit, "AUDIT_END"));

        assert_eq!(emitter.records().len(), 1);
        emitter.clear();
        assert!(clone.records().is_empty());
    }

    #[test]
    fn test_anomaly_records_are_classified() {
        let emitter = RecordingEmitter::new();
        let anomaly = StackAnomaly::new(AnomalyKind::PopOnEmptyStack, 0);
        emitter.emit(&EventRecord::anomaly(&anomaly, BTreeMap::new()));
        emitter.emit(&record(Channel::Audit, "LOGGER_POP_ON_EMPTY_STACK"));

        assert_eq!(emitter.anomaly_count(AnomalyKind::PopOnEmptyStack), 1);
        assert_eq!(emitter.anomaly_count(AnomalyKind::TopOnEmptyStack), 0);
    }

    #[test]
    fn test_last_on_channel() {
        let emitter = RecordingEmitter::new();
        emitter.emit(&record(Channel::Metric, "first"));
        emitter.emit(&record(Channel::Audit, "audit"));
        emitter.emit(&record(Channel::Metric, "second"));

        let last = emitter.last_on(Channel::Metric).unwrap();
        assert_eq!(last.message, "second");
        assert!(emitter.last_on(Channel::Debug).is_none());
    }
}
