//! Reconstructor
//!
//! Replays a delta batch onto a committed baseline to produce the effective
//! state a user continues editing from.
//!
//! ## Contract
//!
//! - **Delete** removes the record with that identity, children included.
//! - **Add** inserts the record and all of its nested children.
//! - **Change** overlays changed scalar fields on the existing record, then
//!   replays its nested deltas onto that record's own lists.
//! - The result is canonical, so `apply(c, diff(c, d)) == d.canonical()`.
//!
//! Only the records a delta touches are rebuilt; everything else in the
//! baseline is moved through untouched.
//!
//! ## Example
//!
//! ```
//! use jobdelta_core::apply::apply;
//! use jobdelta_core::diff::{Delta, Family, Fields, Identity};
//! use jobdelta_core::model::JobState;
//!
//! let committed = JobState { plan_id: Some(5), ..JobState::default() };
//! let mut fields = Fields::new();
//! fields.insert("planId".to_string(), serde_json::json!(7));
//! let deltas = vec![
//!     Delta::delete(Family::Plan, Identity::Id(5), Fields::new()),
//!     Delta::add(Family::Plan, Identity::Id(7), fields),
//! ];
//!
//! let effective = apply(committed, &deltas).unwrap();
//! assert_eq!(effective.plan_id, Some(7));
//! ```

use crate::diff::families::adapter_for;
use crate::diff::model::Delta;
use crate::errors::{JobDeltaError, Result};
use crate::model::{ChangeOrder, CommittedState, EffectiveState};
use crate::{log_op_end, log_op_error, log_op_start};

/// Replay `deltas`, in order, onto `committed`.
///
/// # Errors
///
/// - `InvalidDelta` if a delta is malformed or a nested-only family appears at top level
/// - `DeltaTargetMissing` if a Change names a record absent from the baseline
pub fn apply(committed: CommittedState, deltas: &[Delta]) -> Result<EffectiveState> {
    log_op_start!("apply", delta_count = deltas.len());
    let start = std::time::Instant::now();

    let effective = apply_impl(committed, deltas).map_err(|e| {
        log_op_error!(
            "apply",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!("apply", duration_ms = start.elapsed().as_millis() as u64);
    Ok(effective)
}

fn apply_impl(committed: CommittedState, deltas: &[Delta]) -> Result<EffectiveState> {
    let mut state = committed.canonical();

    // Families are independent; consecutive runs of one family replay together.
    for run in deltas.chunk_by(|a, b| a.family == b.family) {
        let family = run[0].family;
        let adapter = adapter_for(family).ok_or_else(|| JobDeltaError::InvalidDelta {
            family,
            reason: "only valid nested under a choice or option".to_string(),
        })?;
        adapter.apply(&mut state, run)?;
    }

    Ok(state.canonical())
}

/// State to restore when the user discards their edits.
///
/// With an open (Pending) change order this replays its deltas onto the
/// committed baseline; otherwise it is the committed state itself. A change
/// order in any other status has already left the editing flow and is not
/// replayed.
///
/// # Errors
///
/// As for [`apply`], plus `InvalidDelta` for deltas outside the order's kind.
pub fn restore(committed: CommittedState, open: Option<&ChangeOrder>) -> Result<EffectiveState> {
    let job_id = open.map(|co| co.job_id).unwrap_or_default();
    log_op_start!("restore", job_id = job_id);
    let start = std::time::Instant::now();

    let result = match open {
        Some(co) if co.status.is_open() => co
            .validate_schema()
            .and_then(|_| apply(committed, &co.deltas)),
        Some(co) => {
            tracing::warn!(
                change_order_id = co.id.unwrap_or_default(),
                status = ?co.status,
                "change order is not open; restoring committed state"
            );
            Ok(committed.canonical())
        }
        None => Ok(committed.canonical()),
    };

    let effective = result.map_err(|e| {
        log_op_error!(
            "restore",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            job_id = job_id
        );
        e
    })?;

    log_op_end!("restore", duration_ms = start.elapsed().as_millis() as u64);
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::{Family, Fields, Identity};
    use crate::model::{ChangeOrderKind, ChangeOrderStatus, Choice, JobState};

    fn plan_swap() -> Vec<Delta> {
        let mut fields = Fields::new();
        fields.insert("planId".into(), serde_json::json!(7));
        vec![
            Delta::delete(Family::Plan, Identity::Id(5), Fields::new()),
            Delta::add(Family::Plan, Identity::Id(7), fields),
        ]
    }

    #[test]
    fn test_empty_batch_yields_canonical_committed() {
        let committed = JobState {
            choices: vec![Choice::new(2, 1), Choice::new(1, 0)],
            ..JobState::default()
        };
        let effective = apply(committed.clone(), &[]).unwrap();
        assert_eq!(effective, committed.canonical());
    }

    #[test]
    fn test_top_level_attribute_delta_rejected() {
        let delta = Delta::delete(Family::Attribute, Identity::Pair(1, 1), Fields::new());
        let err = apply(JobState::default(), &[delta]).unwrap_err();
        assert!(matches!(
            err,
            JobDeltaError::InvalidDelta {
                family: Family::Attribute,
                ..
            }
        ));
    }

    #[test]
    fn test_restore_replays_open_order_only() {
        let committed = JobState {
            plan_id: Some(5),
            ..JobState::default()
        };
        let mut order = ChangeOrder {
            id: Some(3),
            job_id: 1,
            kind: ChangeOrderKind::Plan,
            status: ChangeOrderStatus::Pending,
            base_version: 1,
            deltas: plan_swap(),
        };
        assert_eq!(restore(committed.clone(), Some(&order)).unwrap().plan_id, Some(7));

        order.status = ChangeOrderStatus::Withdrawn;
        assert_eq!(restore(committed.clone(), Some(&order)).unwrap().plan_id, Some(5));
        assert_eq!(restore(committed, None).unwrap().plan_id, Some(5));
    }
}
