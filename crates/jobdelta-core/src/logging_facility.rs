//! Structured logging facility for the reconciliation engine
//!
//! - Single initialization point via [`init`] / [`init_with_filter`]
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use jobdelta_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Public engine operations own their start/end events; helpers below them
//! only emit `tracing::debug!`/`tracing::warn!` details.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_with_filter, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
