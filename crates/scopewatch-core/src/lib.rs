//! Scopewatch Core - nested timing and context correlation for audit/metric logging
//!
//! This crate provides:
//! - A per-execution-context stack of timing frames that heals itself on
//!   mismatched push/pop instead of failing the caller
//! - An ambient context store whose fields are attached to every record
//! - A scope coordinator that binds audit/metric boundaries to stack
//!   transitions, context writes and record emission
//! - Pluggable record sinks (`tracing`, in-memory) and an injectable clock
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use scopewatch_core::{ExecutionContext, RecordingEmitter, ScopeCoordinator, ScopeOutcome};
//!
//! let emitter = RecordingEmitter::new();
//! let scopes = ScopeCoordinator::with_emitter(Arc::new(emitter.clone()));
//!
//! ExecutionContext::sync_scope(|| {
//!     scopes.begin_audit();
//!     scopes.begin_metric_for("lookup", "db-1");
//!     scopes.end_metric(ScopeOutcome::complete());
//!     scopes.end_audit(ScopeOutcome::complete());
//! });
//! assert_eq!(emitter.records().len(), 4);
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod emitter;
pub mod errors;
pub mod fields;
pub mod frame;
pub mod logging_facility;
pub mod outcome;
pub mod stack;
pub mod stopwatch;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ScopewatchConfig;
pub use context::ExecutionContext;
pub use coordinator::ScopeCoordinator;
pub use emitter::{Channel, EventEmitter, EventRecord, RecordingEmitter, TracingEmitter};
pub use errors::{AnomalyKind, ConfigError, Result, StackAnomaly};
pub use fields::ContextStore;
pub use frame::TimingFrame;
pub use outcome::ScopeOutcome;
pub use stack::TimingStack;
pub use stopwatch::Stopwatch;
