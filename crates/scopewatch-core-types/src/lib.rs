//! Core types shared across the scopewatch crates
//!
//! This crate provides the foundational types used by the timing engine
//! and by anything that emits or consumes its log records:
//!
//! - **Correlation types**: RequestId, InstanceId
//! - **Schema**: the context key vocabulary, sentinels, message identifiers
//!   and scope status codes

pub mod correlation;
pub mod schema;

pub use correlation::{InstanceId, RequestId};
pub use schema::{ContextKey, StatusCode};
