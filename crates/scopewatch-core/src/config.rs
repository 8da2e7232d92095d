//! Configuration loading from TOML

use serde::Deserialize;
use std::{fs, path::Path};

use scopewatch_core_types::schema::{
    PLACEHOLDER_REQUEST_ID, PLACEHOLDER_SERVICE_INSTANCE_ID, PLACEHOLDER_UNKNOWN,
};
use scopewatch_core_types::InstanceId;

use crate::errors::{ConfigError, Result};
use crate::logging_facility::{self, Profile};

/// Engine configuration
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopewatchConfig {
    /// Written to `RequestId` when absent at emission time
    pub request_placeholder: String,
    /// Written to `ServiceInstanceId` when absent at emission time
    pub service_instance_placeholder: String,
    /// Written to target identity fields when absent at emission time
    pub unknown_placeholder: String,
    /// Emit `AUDIT_BEGIN` / `METRICS_BEGIN` records when a scope opens
    pub emit_begin_records: bool,
    /// Pop orphaned metric frames when an audit scope ends
    pub unwind_on_audit_end: bool,
    pub instance: InstanceIdentity,
    pub logging: LoggingConfig,
}

/// Identity of this process, stamped on every record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceIdentity {
    pub instance_uuid: InstanceId,
    pub server_ip: String,
    pub server_fqdn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

impl Default for ScopewatchConfig {
    fn default() -> Self {
        Self {
            request_placeholder: PLACEHOLDER_REQUEST_ID.to_string(),
            service_instance_placeholder: PLACEHOLDER_SERVICE_INSTANCE_ID.to_string(),
            unknown_placeholder: PLACEHOLDER_UNKNOWN.to_string(),
            emit_begin_records: true,
            unwind_on_audit_end: false,
            instance: InstanceIdentity::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for InstanceIdentity {
    fn default() -> Self {
        Self {
            instance_uuid: InstanceId::new(),
            server_ip: String::new(),
            server_fqdn: String::new(),
        }
    }
}

impl ScopewatchConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed TOML or unknown keys, `Invalid` when a
    /// placeholder is empty.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: ScopewatchConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`ScopewatchConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration if the file exists
    ///
    /// # Errors
    ///
    /// As [`ScopewatchConfig::load`].
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Check invariants serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let placeholders = [
            ("request_placeholder", &self.request_placeholder),
            (
                "service_instance_placeholder",
                &self.service_instance_placeholder,
            ),
            ("unknown_placeholder", &self.unknown_placeholder),
        ];
        for (field, value) in placeholders {
            if value.is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Install the tracing subscriber for the configured profile
    pub fn init_logging(&self) {
        logging_facility::init(self.logging.profile);
    }
}
