//! Job-level reconciliation
//!
//! Runs the family adapters over a whole job and packages the result as a
//! change order of one kind.
//!
//! ## Change-order rules
//!
//! - A job has at most one Pending change order. Requesting a different kind
//!   while one is pending is a conflict; requesting the same kind revises the
//!   pending order in place and keeps its id.
//! - The diff is always taken against the committed state, so a revision
//!   carries the complete delta set, not an increment.
//! - The committed version the diff was taken against is recorded so the
//!   persistence layer can detect a stale submission with [`ensure_current`].

use crate::config::ChangeOrderConfig;
use crate::diff::families::{adapter_for, TOP_LEVEL_FAMILIES};
use crate::diff::model::{Delta, Family};
use crate::errors::{JobDeltaError, Result};
use crate::model::{ChangeOrder, ChangeOrderKind, ChangeOrderStatus, CommittedState, DesiredState};
use crate::{log_op_end, log_op_error, log_op_start};

fn diff_families(
    families: &[Family],
    committed: &CommittedState,
    desired: &DesiredState,
) -> Result<Vec<Delta>> {
    let mut deltas = Vec::new();
    for family in families {
        if let Some(adapter) = adapter_for(*family) {
            let family_deltas = adapter.diff(committed, desired)?;
            tracing::debug!(
                family = family.as_str(),
                delta_count = family_deltas.len(),
                "family diffed"
            );
            deltas.extend(family_deltas);
        }
    }
    Ok(deltas)
}

/// Deltas across every top-level family.
///
/// # Errors
///
/// `InconsistentIdentity` if either state holds duplicate keys in a family.
pub fn diff_job(committed: &CommittedState, desired: &DesiredState) -> Result<Vec<Delta>> {
    log_op_start!("diff_job");
    let start = std::time::Instant::now();

    let deltas = diff_families(&TOP_LEVEL_FAMILIES, committed, desired).map_err(|e| {
        log_op_error!(
            "diff_job",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "diff_job",
        duration_ms = start.elapsed().as_millis() as u64,
        delta_count = deltas.len()
    );
    Ok(deltas)
}

/// Deltas restricted to the families a change-order kind owns.
///
/// # Errors
///
/// `InconsistentIdentity` if either state holds duplicate keys in a family.
pub fn diff_for_kind(
    kind: ChangeOrderKind,
    committed: &CommittedState,
    desired: &DesiredState,
) -> Result<Vec<Delta>> {
    log_op_start!("diff_for_kind", change_order_kind = kind.as_str());
    let start = std::time::Instant::now();

    let deltas = diff_families(kind.families(), committed, desired).map_err(|e| {
        log_op_error!(
            "diff_for_kind",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            change_order_kind = kind.as_str()
        );
        e
    })?;

    log_op_end!(
        "diff_for_kind",
        duration_ms = start.elapsed().as_millis() as u64,
        delta_count = deltas.len()
    );
    Ok(deltas)
}

/// Inputs for building (or revising) a change order
#[derive(Debug, Clone, Copy)]
pub struct ChangeOrderRequest<'a> {
    pub kind: ChangeOrderKind,
    pub job_id: i64,
    pub committed: &'a CommittedState,
    /// Version of `committed` as read from persistence
    pub committed_version: u64,
    pub desired: &'a DesiredState,
    /// The job's currently open change order, if any
    pub open: Option<&'a ChangeOrder>,
}

/// Build a Pending change order of `request.kind`.
///
/// # Errors
///
/// - `PendingChangeOrderConflict` if another kind is already pending for the job
/// - `EmptyChangeOrder` if nothing differs and `config.reject_empty` is set
/// - `InconsistentIdentity` from the diff
pub fn build_change_order(
    request: ChangeOrderRequest<'_>,
    config: &ChangeOrderConfig,
) -> Result<ChangeOrder> {
    log_op_start!(
        "build_change_order",
        job_id = request.job_id,
        change_order_kind = request.kind.as_str(),
        base_version = request.committed_version
    );
    let start = std::time::Instant::now();

    let change_order = build_change_order_impl(request, config).map_err(|e| {
        log_op_error!(
            "build_change_order",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            job_id = request.job_id
        );
        e
    })?;

    log_op_end!(
        "build_change_order",
        duration_ms = start.elapsed().as_millis() as u64,
        job_id = request.job_id,
        delta_count = change_order.deltas.len()
    );
    Ok(change_order)
}

fn build_change_order_impl(
    request: ChangeOrderRequest<'_>,
    config: &ChangeOrderConfig,
) -> Result<ChangeOrder> {
    let pending = request
        .open
        .filter(|co| co.status.is_open() && co.job_id == request.job_id);

    let id = match pending {
        Some(open) if open.kind != request.kind => {
            return Err(JobDeltaError::PendingChangeOrderConflict {
                open_id: open.id.unwrap_or_default(),
                open_kind: open.kind,
                requested_kind: request.kind,
            });
        }
        Some(open) => {
            tracing::debug!(
                change_order_id = open.id.unwrap_or_default(),
                "revising pending change order"
            );
            open.id
        }
        None => None,
    };

    let deltas = diff_for_kind(request.kind, request.committed, request.desired)?;
    if deltas.is_empty() && config.reject_empty {
        return Err(JobDeltaError::EmptyChangeOrder { kind: request.kind });
    }

    Ok(ChangeOrder {
        id,
        job_id: request.job_id,
        kind: request.kind,
        status: ChangeOrderStatus::Pending,
        base_version: request.committed_version,
        deltas,
    })
}

/// Check a change order's base version against the current committed version.
///
/// # Errors
///
/// `StaleCommittedState` if the committed state moved after the diff.
pub fn ensure_current(base_version: u64, current_version: u64) -> Result<()> {
    if base_version == current_version {
        Ok(())
    } else {
        Err(JobDeltaError::StaleCommittedState {
            diffed_against: base_version,
            current: current_version,
        })
    }
}
