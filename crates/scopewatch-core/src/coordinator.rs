//! Audit and metric scope discipline
//!
//! An audit scope is the outermost timed boundary of one logical operation;
//! metric scopes nest inside it. The coordinator binds stack transitions to
//! context store writes and to record emission:
//!
//! ```text
//! Idle --begin_*--> Running(1) --begin_metric--> Running(2)
//!      <--end_*---             <--end_metric---
//! ```
//!
//! An `end_*` on an idle context is clamped to idle and reported; the
//! coordinator never fails or panics on a discipline violation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

use scopewatch_core_types::schema::{
    MSG_AUDIT_BEGIN, MSG_AUDIT_END, MSG_METRICS_BEGIN, MSG_METRICS_END,
};
use scopewatch_core_types::{ContextKey, RequestId};

use crate::clock::{format_millis, Clock, SystemClock};
use crate::config::ScopewatchConfig;
use crate::context::ExecutionContext;
use crate::emitter::{Channel, EventEmitter, EventRecord};
use crate::errors::{AnomalyKind, StackAnomaly};
use crate::frame::TimingFrame;
use crate::outcome::{normalize_arg, ScopeOutcome};
use crate::stopwatch::Stopwatch;

/// Fields cleared after a metric record is emitted
pub const METRIC_SCOPED_KEYS: [ContextKey; 12] = [
    ContextKey::BeginTimestamp,
    ContextKey::EndTimestamp,
    ContextKey::ElapsedTime,
    ContextKey::TargetEntity,
    ContextKey::TargetServiceName,
    ContextKey::StatusCode,
    ContextKey::ResponseCode,
    ContextKey::ResponseDescription,
    ContextKey::CustomField1,
    ContextKey::CustomField2,
    ContextKey::CustomField3,
    ContextKey::CustomField4,
];

/// Fields cleared after an audit record is emitted
pub const AUDIT_SCOPED_KEYS: [ContextKey; 17] = [
    ContextKey::BeginTimestamp,
    ContextKey::EndTimestamp,
    ContextKey::ElapsedTime,
    ContextKey::TargetEntity,
    ContextKey::TargetServiceName,
    ContextKey::StatusCode,
    ContextKey::ResponseCode,
    ContextKey::ResponseDescription,
    ContextKey::CustomField1,
    ContextKey::CustomField2,
    ContextKey::CustomField3,
    ContextKey::CustomField4,
    ContextKey::RequestId,
    ContextKey::ServiceInstanceId,
    ContextKey::ServiceName,
    ContextKey::RemoteHost,
    ContextKey::User,
];

/// Opens and closes audit/metric scopes on the calling execution context
#[derive(Clone)]
pub struct ScopeCoordinator {
    stopwatch: Stopwatch,
    emitter: Arc<dyn EventEmitter>,
    config: Arc<ScopewatchConfig>,
}

impl ScopeCoordinator {
    pub fn new(
        clock: Arc<dyn Clock>,
        emitter: Arc<dyn EventEmitter>,
        config: ScopewatchConfig,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            stopwatch: Stopwatch::with_config(clock, emitter.clone(), config.clone()),
            emitter,
            config,
        }
    }

    /// Wall clock and default configuration
    pub fn with_emitter(emitter: Arc<dyn EventEmitter>) -> Self {
        Self::new(Arc::new(SystemClock), emitter, ScopewatchConfig::default())
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn config(&self) -> &ScopewatchConfig {
        &self.config
    }

    // ===== Scope boundaries =====

    /// Reset the stack and open a root audit frame
    pub fn begin_audit(&self) {
        self.open_audit(None);
    }

    /// Open a root audit frame and seed the target fields immediately
    pub fn begin_audit_for(&self, target: &str, target_service: &str) {
        self.open_audit(Some((target, target_service)));
    }

    /// Open a nested metric frame without a target
    pub fn begin_metric(&self) {
        self.open_metric(None, None);
    }

    /// Open a nested metric frame for `operation` on `target`
    pub fn begin_metric_for(&self, operation: &str, target: &str) {
        self.open_metric(Some(operation), Some(target));
    }

    /// Close the current audit scope and emit its record
    ///
    /// Stops and pops the top frame. Frames still open afterwards are
    /// reported as `NonEmptyStackAtAuditEnd`; they stay on the stack unless
    /// `unwind_on_audit_end` is set. Audit-scoped fields are cleared after
    /// emission.
    pub fn end_audit(&self, outcome: ScopeOutcome) {
        let unwind = self.config.unwind_on_audit_end;
        let fields = self.stopwatch.within(|ctx, now| {
            let elapsed = Self::close_top(ctx, now)
                .map(|frame| frame.duration())
                .unwrap_or_default();
            let remaining = ctx.stack().depth();
            if remaining > 0 {
                ctx.stack_mut().report(StackAnomaly::new(
                    AnomalyKind::NonEmptyStackAtAuditEnd,
                    remaining,
                ));
                if unwind {
                    ctx.stack_mut().clear();
                }
            }
            self.apply_outcome(ctx, &outcome, elapsed);
            ctx.fields().snapshot()
        });
        self.emit_end(Channel::Audit, MSG_AUDIT_END, &outcome, fields);
        ExecutionContext::current(|ctx| ctx.fields_mut().remove_all(&AUDIT_SCOPED_KEYS));
    }

    /// Close the current metric scope and emit its record
    ///
    /// A metric frame without a target or operation reports `UNKNOWN` rather
    /// than the enclosing scope's identity. Only metric-scoped fields are
    /// cleared; audit-level fields such as the request id survive for the rest
    /// of the audit scope, and the enclosing frame's target is restored.
    pub fn end_metric(&self, outcome: ScopeOutcome) {
        let unknown = self.config.unknown_placeholder.as_str();
        let fields = self.stopwatch.within(|ctx, now| {
            let frame = Self::close_top(ctx, now);
            let elapsed = frame.as_ref().map(TimingFrame::duration).unwrap_or_default();
            let fields = ctx.fields_mut();
            if frame.as_ref().and_then(TimingFrame::target).map_or(true, str::is_empty) {
                fields.put(ContextKey::TargetEntity, unknown);
            }
            if frame.as_ref().and_then(TimingFrame::operation).is_none() {
                fields.put(ContextKey::TargetServiceName, unknown);
            }
            self.apply_outcome(ctx, &outcome, elapsed);
            ctx.fields().snapshot()
        });
        self.emit_end(Channel::Metric, MSG_METRICS_END, &outcome, fields);
        ExecutionContext::current(|ctx| {
            ctx.fields_mut().remove_all(&METRIC_SCOPED_KEYS);
            Self::restore_target(ctx);
        });
    }

    /// Emit an arbitrary record with the prepared ambient fields
    pub fn record<I, S>(&self, level: Level, channel: Channel, message: &str, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = ExecutionContext::current(|ctx| {
            self.prepare(ctx);
            ctx.fields().snapshot()
        });
        let args = args.into_iter().map(|a| normalize_arg(a.as_ref())).collect();
        self.emitter.emit(&EventRecord {
            level,
            channel,
            message: message.to_owned(),
            fields,
            args,
        });
    }

    // ===== Stack passthrough =====

    /// Drop every frame of the calling context
    pub fn clear(&self) {
        self.stopwatch.clear();
    }

    pub fn duration(&self) -> Duration {
        self.stopwatch.duration()
    }

    pub fn current_duration(&self) -> Duration {
        self.stopwatch.current_duration()
    }

    pub fn is_empty(&self) -> bool {
        self.stopwatch.is_empty()
    }

    // ===== Ambient fields =====

    pub fn set_log_context(&self, request_id: &str, service_instance_id: &str) {
        Self::put_all(&[
            (ContextKey::RequestId, request_id),
            (ContextKey::ServiceInstanceId, service_instance_id),
        ]);
    }

    pub fn set_logger_parameters(&self, remote_host: &str, user: &str) {
        Self::put_all(&[
            (ContextKey::RemoteHost, remote_host),
            (ContextKey::User, user),
        ]);
    }

    pub fn set_service_name(&self, name: &str) {
        Self::put_all(&[(ContextKey::ServiceName, name)]);
    }

    pub fn reset_service_name(&self) {
        ExecutionContext::current(|ctx| {
            ctx.fields_mut().remove(ContextKey::ServiceName);
        });
    }

    /// Generate, store and return a fresh request id
    pub fn new_request_id(&self) -> RequestId {
        let id = RequestId::new();
        Self::put_all(&[(ContextKey::RequestId, id.as_str())]);
        id
    }

    pub fn set_request_id(&self, request_id: &str) {
        Self::put_all(&[(ContextKey::RequestId, request_id)]);
    }

    pub fn set_remote_host(&self, remote_host: &str) {
        Self::put_all(&[(ContextKey::RemoteHost, remote_host)]);
    }

    /// Override the configured instance id for the calling context
    pub fn set_instance_id(&self, instance_id: &str) {
        Self::put_all(&[(ContextKey::InstanceUuid, instance_id)]);
    }

    /// Current value of a context field
    pub fn field(&self, key: ContextKey) -> Option<String> {
        ExecutionContext::current(|ctx| ctx.fields().get(key).map(str::to_owned))
    }

    // ===== Internals =====

    fn open_audit(&self, target: Option<(&str, &str)>) {
        let fields = self.stopwatch.within(|ctx, now| {
            ctx.stack_mut().clear();
            ctx.stack_mut().push(
                target.map(|(_, service)| service.to_owned()),
                target.map(|(entity, _)| entity.to_owned()),
            );
            ctx.start(now);
            if let Some((entity, service)) = target {
                ctx.fields_mut().put(ContextKey::TargetEntity, entity);
                ctx.fields_mut()
                    .put(ContextKey::TargetServiceName, service);
            }
            self.begin_snapshot(ctx)
        });
        if let Some(fields) = fields {
            self.emit_begin(Channel::Audit, MSG_AUDIT_BEGIN, fields);
        }
    }

    fn open_metric(&self, operation: Option<&str>, target: Option<&str>) {
        let fields = self.stopwatch.within(|ctx, now| {
            ctx.stack_mut()
                .push(operation.map(str::to_owned), target.map(str::to_owned));
            ctx.start(now);
            self.begin_snapshot(ctx)
        });
        if let Some(fields) = fields {
            self.emit_begin(Channel::Metric, MSG_METRICS_BEGIN, fields);
        }
    }

    /// Stop and pop the top frame
    fn close_top(ctx: &mut ExecutionContext, now: DateTime<Utc>) -> Option<TimingFrame> {
        ctx.stop(now);
        ctx.stack_mut().pop()
    }

    /// Re-seed target fields from the frame left on top, if it names one
    fn restore_target(ctx: &mut ExecutionContext) {
        let Some(frame) = ctx.stack().peek() else {
            return;
        };
        let target = frame.target().filter(|t| !t.is_empty()).map(str::to_owned);
        let operation = frame.operation().map(str::to_owned);
        if let Some(target) = target {
            ctx.fields_mut().put(ContextKey::TargetEntity, target);
        }
        if let Some(operation) = operation {
            ctx.fields_mut().put(ContextKey::TargetServiceName, operation);
        }
    }

    fn begin_snapshot(&self, ctx: &mut ExecutionContext) -> Option<BTreeMap<ContextKey, String>> {
        if !self.config.emit_begin_records {
            return None;
        }
        self.prepare(ctx);
        Some(ctx.fields().snapshot())
    }

    fn apply_outcome(&self, ctx: &mut ExecutionContext, outcome: &ScopeOutcome, elapsed: Duration) {
        let fields = ctx.fields_mut();
        fields.put(ContextKey::ElapsedTime, format_millis(elapsed));
        fields.put(ContextKey::StatusCode, outcome.status().as_str());
        if let Some(code) = outcome.response_code() {
            fields.put(ContextKey::ResponseCode, code);
        }
        if let Some(description) = outcome.response_description() {
            fields.put(ContextKey::ResponseDescription, normalize_arg(description));
        }
        for (key, value) in ContextKey::CUSTOM_FIELDS.iter().zip(outcome.custom_fields()) {
            fields.put(*key, normalize_arg(value));
        }
        fields.backfill(ContextKey::TargetEntity, &self.config.unknown_placeholder);
        fields.backfill(ContextKey::TargetServiceName, &self.config.unknown_placeholder);
        self.prepare(ctx);
    }

    fn prepare(&self, ctx: &mut ExecutionContext) {
        ctx.fields_mut().prepare(&self.config);
    }

    fn emit_begin(&self, channel: Channel, message: &str, fields: BTreeMap<ContextKey, String>) {
        self.emitter.emit(&EventRecord {
            level: Level::INFO,
            channel,
            message: message.to_owned(),
            fields,
            args: Vec::new(),
        });
    }

    fn emit_end(
        &self,
        channel: Channel,
        default_message: &str,
        outcome: &ScopeOutcome,
        fields: BTreeMap<ContextKey, String>,
    ) {
        self.emitter.emit(&EventRecord {
            level: Level::INFO,
            channel,
            message: outcome.message().unwrap_or(default_message).to_owned(),
            fields,
            args: outcome.args().iter().map(|a| normalize_arg(a)).collect(),
        });
    }

    fn put_all(entries: &[(ContextKey, &str)]) {
        ExecutionContext::current(|ctx| {
            for (key, value) in entries {
                ctx.fields_mut().put(*key, *value);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::emitter::RecordingEmitter;

    #[test]
    fn test_audit_scoped_keys_cover_metric_scoped_keys() {
        for key in METRIC_SCOPED_KEYS {
            assert!(AUDIT_SCOPED_KEYS.contains(&key), "{key} missing");
        }
        assert!(!METRIC_SCOPED_KEYS.contains(&ContextKey::RequestId));
    }

    #[test]
    fn test_begin_records_can_be_disabled() {
        ExecutionContext::sync_scope(|| {
            let emitter = RecordingEmitter::new();
            let config = ScopewatchConfig {
                emit_begin_records: false,
                ..ScopewatchConfig::default()
            };
            let coordinator = ScopeCoordinator::new(
                Arc::new(ManualClock::default()),
                Arc::new(emitter.clone()),
                config,
            );

            coordinator.begin_audit();
            coordinator.begin_metric();
            assert!(emitter.records().is_empty());
        });
    }

    #[test]
    fn test_prepare_keeps_overridden_instance_id() {
        ExecutionContext::sync_scope(|| {
            let emitter = RecordingEmitter::new();
            let coordinator = ScopeCoordinator::with_emitter(Arc::new(emitter.clone()));
            coordinator.set_instance_id("override");
            coordinator.record(Level::DEBUG, Channel::Debug, "PING", ["a|b"]);

            let record = emitter.last_on(Channel::Debug).unwrap();
            assert_eq!(record.field(ContextKey::InstanceUuid), Some("override"));
            assert_eq!(record.args, vec!["a!b".to_string()]);
        });
    }
}
