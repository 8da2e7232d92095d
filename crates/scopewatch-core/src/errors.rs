use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ConfigError
pub type Result<T> = std::result::Result<T, ConfigError>;

// ========== Stack Discipline Anomalies ==========

/// Classification of stack-discipline violations
///
/// Anomalies are never returned to the caller. They are reported as
/// low-severity records and the stack heals itself. Each kind maps to a
/// stable code used as the message identifier of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// `pop` on an empty stack; treated as a no-op
    PopOnEmptyStack,
    /// Read of the top frame on an empty stack; a placeholder frame is pushed
    TopOnEmptyStack,
    /// An audit scope ended while nested metric frames were still open
    NonEmptyStackAtAuditEnd,
}

impl AnomalyKind {
    /// Get the stable code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            AnomalyKind::PopOnEmptyStack => "LOGGER_POP_ON_EMPTY_STACK",
            AnomalyKind::TopOnEmptyStack => "LOGGER_TOP_ON_EMPTY_STACK",
            AnomalyKind::NonEmptyStackAtAuditEnd => "LOGGER_NON_EMPTY_STACK",
        }
    }

    pub fn from_code(code: &str) -> Option<AnomalyKind> {
        [
            AnomalyKind::PopOnEmptyStack,
            AnomalyKind::TopOnEmptyStack,
            AnomalyKind::NonEmptyStackAtAuditEnd,
        ]
        .into_iter()
        .find(|k| k.code() == code)
    }
}

/// A single observed anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackAnomaly {
    kind: AnomalyKind,
    depth: usize,
}

impl StackAnomaly {
    /// `depth` is the stack depth at the moment the anomaly was detected
    pub fn new(kind: AnomalyKind, depth: usize) -> Self {
        Self { kind, depth }
    }

    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl std::fmt::Display for StackAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            AnomalyKind::PopOnEmptyStack => write!(f, "[{}] pop on empty timing stack", self.code()),
            AnomalyKind::TopOnEmptyStack => {
                write!(f, "[{}] top on empty timing stack", self.code())
            }
            AnomalyKind::NonEmptyStackAtAuditEnd => write!(
                f,
                "[{}] audit scope ended with {} open frame(s)",
                self.code(),
                self.depth
            ),
        }
    }
}

// ========== Configuration Errors ==========

/// Errors raised while loading configuration
///
/// This is the only fallible surface of the crate; timing operations never
/// fail.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "ERR_CONFIG_IO",
            ConfigError::Parse(_) => "ERR_CONFIG_PARSE",
            ConfigError::Invalid { .. } => "ERR_CONFIG_INVALID",
        }
    }
}
