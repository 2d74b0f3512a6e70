//! JobDelta Core - change-order reconciliation engine
//!
//! This crate computes and replays typed deltas between the committed
//! configuration of a home-building job and a newly desired one:
//! - Canonical job model (choices, options, attributes, locations, buyers, singletons)
//! - Entity normalizer for committed and change-order record shapes
//! - Generic three-way diff with per-family adapters and a nested differ
//! - Reconstructor that replays deltas onto a committed baseline
//! - Lock resolver for locked-in choices and historic option mappings
//! - Change-order kinds, statuses and the one-pending-per-job rule
//!
//! Every operation is synchronous and side-effect free apart from logging.

pub mod apply;
pub mod config;
pub mod diff;
pub mod errors;
pub mod lock;
pub mod logging_facility;
pub mod model;
pub mod normalize;
pub mod reconcile;

pub use jobdelta_core_types::schema;

// Re-export commonly used types
pub use apply::{apply, restore};
pub use config::EngineConfig;
pub use diff::{Action, Delta, Family, Identity};
pub use errors::{ExError, ExErrorKind, JobDeltaError, Result};
pub use lock::{resolve_locked_choices, HistoricOptionMapping, LockResolution, Warning};
pub use model::{ChangeOrder, ChangeOrderKind, ChangeOrderStatus, CommittedState, JobState};
pub use reconcile::{build_change_order, diff_for_kind, diff_job, ensure_current, ChangeOrderRequest};
