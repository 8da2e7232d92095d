//! Canonical schema constants for the context store and emitted records
//!
//! These constants keep key names, sentinels and message identifiers
//! consistent between the timing engine and whatever renders its output.

use serde::{Serialize, Serializer};

/// Fixed vocabulary of context store keys
///
/// The string forms are the field names that appear in rendered log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKey {
    // Correlation
    RequestId,
    ServiceInstanceId,
    ServiceName,
    RemoteHost,
    User,

    // Process identity
    InstanceUuid,
    ServerIpAddress,
    ServerFqdn,

    // Timing
    BeginTimestamp,
    EndTimestamp,
    ElapsedTime,

    // Target identity
    TargetEntity,
    TargetServiceName,

    // Outcome
    AlertSeverity,
    StatusCode,
    ResponseCode,
    ResponseDescription,

    // Free-form
    CustomField1,
    CustomField2,
    CustomField3,
    CustomField4,
}

impl ContextKey {
    /// Every key, in rendering order
    pub const ALL: [ContextKey; 21] = [
        ContextKey::RequestId,
        ContextKey::ServiceInstanceId,
        ContextKey::ServiceName,
        ContextKey::RemoteHost,
        ContextKey::User,
        ContextKey::InstanceUuid,
        ContextKey::ServerIpAddress,
        ContextKey::ServerFqdn,
        ContextKey::BeginTimestamp,
        ContextKey::EndTimestamp,
        ContextKey::ElapsedTime,
        ContextKey::TargetEntity,
        ContextKey::TargetServiceName,
        ContextKey::AlertSeverity,
        ContextKey::StatusCode,
        ContextKey::ResponseCode,
        ContextKey::ResponseDescription,
        ContextKey::CustomField1,
        ContextKey::CustomField2,
        ContextKey::CustomField3,
        ContextKey::CustomField4,
    ];

    /// Custom field slots, in order
    pub const CUSTOM_FIELDS: [ContextKey; 4] = [
        ContextKey::CustomField1,
        ContextKey::CustomField2,
        ContextKey::CustomField3,
        ContextKey::CustomField4,
    ];

    /// Rendered field name
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKey::RequestId => "RequestId",
            ContextKey::ServiceInstanceId => "ServiceInstanceId",
            ContextKey::ServiceName => "ServiceName",
            ContextKey::RemoteHost => "RemoteHost",
            ContextKey::User => "User",
            ContextKey::InstanceUuid => "InstanceUUID",
            ContextKey::ServerIpAddress => "ServerIPAddress",
            ContextKey::ServerFqdn => "ServerFQDN",
            ContextKey::BeginTimestamp => "BeginTimestamp",
            ContextKey::EndTimestamp => "EndTimestamp",
            ContextKey::ElapsedTime => "ElapsedTime",
            ContextKey::TargetEntity => "TargetEntity",
            ContextKey::TargetServiceName => "TargetServiceName",
            ContextKey::AlertSeverity => "AlertSeverity",
            ContextKey::StatusCode => "StatusCode",
            ContextKey::ResponseCode => "ResponseCode",
            ContextKey::ResponseDescription => "ResponseDescription",
            ContextKey::CustomField1 => "CustomField1",
            ContextKey::CustomField2 => "CustomField2",
            ContextKey::CustomField3 => "CustomField3",
            ContextKey::CustomField4 => "CustomField4",
        }
    }

    /// Look up a key by its rendered name
    pub fn parse(name: &str) -> Option<ContextKey> {
        ContextKey::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContextKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of an audit or metric scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Complete,
    Error,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Complete => "COMPLETE",
            StatusCode::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Sentinels written when a required key is missing at emission time
pub const PLACEHOLDER_REQUEST_ID: &str = "?";
pub const PLACEHOLDER_SERVICE_INSTANCE_ID: &str = "??";
pub const PLACEHOLDER_UNKNOWN: &str = "UNKNOWN";

// Canonical message identifiers
pub const MSG_AUDIT_BEGIN: &str = "AUDIT_BEGIN";
pub const MSG_AUDIT_END: &str = "AUDIT_END";
pub const MSG_METRICS_BEGIN: &str = "METRICS_BEGIN";
pub const MSG_METRICS_END: &str = "METRICS_END";

// Canonical field keys for tracing output
pub const FIELD_CHANNEL: &str = "channel";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_CONTEXT: &str = "context";
pub const FIELD_ARGS: &str = "args";
