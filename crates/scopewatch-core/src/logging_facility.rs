//! Structured logging facility for scopewatch
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Test capture mode for deterministic assertions on emitted records
//!
//! # Usage
//!
//! ```rust
//! use scopewatch_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Production);
//! ```

pub mod init;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, with_test_capture, CapturedEvent, TestCapture};
