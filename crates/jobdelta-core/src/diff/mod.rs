//! Reconciliation diff.
//!
//! Computes typed Add/Change/Delete deltas between a committed job state and
//! a desired one.
//!
//! ## Layers
//!
//! - [`engine`]: the generic three-way classifier and its replay counterpart
//! - [`nested`]: options, attributes and locations nested under a choice
//! - [`families`]: per-family adapters over a whole [`crate::model::JobState`]
//! - [`model`]: the delta wire types
//!
//! ## Guarantees
//!
//! - **Determinism**: Deletes in identity order, then Adds/Changes in identity order.
//! - **No no-ops**: an unchanged item never produces a delta.
//! - **Cascading deletes**: a deleted item carries Delete deltas for all of its children.

pub mod engine;
pub mod families;
pub mod model;
pub mod nested;

pub use engine::{apply_family, diff_family, Reconcilable};
pub use families::{adapter_for, diff_buyers, FamilyAdapter, TOP_LEVEL_FAMILIES};
pub use model::{Action, Delta, DeltaChildren, DeltaFlags, Family, Fields, Identity};
