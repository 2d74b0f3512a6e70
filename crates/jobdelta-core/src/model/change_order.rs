//! Change-order model
//!
//! A change order is a reviewable batch of deltas against a job's committed
//! state. Each kind owns a fixed set of entity families; a delta outside that
//! set is not part of the kind's schema and is rejected.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::diff::model::{Action, Delta, Family};
use crate::errors::{JobDeltaError, Result};

/// The independent kinds of change order a job can receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOrderKind {
    /// Buyer and trust changes on the sales agreement
    Sales,
    /// Choice/option selections and handing
    Construction,
    /// Plan swap, with the selections it drags along
    Plan,
    /// Moving the job to another lot
    LotTransfer,
    /// Free-text option requests
    NonStandard,
}

impl ChangeOrderKind {
    pub const ALL: [ChangeOrderKind; 5] = [
        ChangeOrderKind::Sales,
        ChangeOrderKind::Construction,
        ChangeOrderKind::Plan,
        ChangeOrderKind::LotTransfer,
        ChangeOrderKind::NonStandard,
    ];

    /// Families whose deltas make up this kind's schema, in emission order
    pub fn families(&self) -> &'static [Family] {
        match self {
            ChangeOrderKind::Sales => &[Family::Buyer, Family::Trust],
            ChangeOrderKind::Construction => &[Family::Choice, Family::Option, Family::Handing],
            ChangeOrderKind::Plan => &[Family::Plan, Family::Choice, Family::Option],
            ChangeOrderKind::LotTransfer => &[Family::Lot, Family::Handing],
            ChangeOrderKind::NonStandard => &[Family::NonStandardOption],
        }
    }

    pub fn accepts(&self, family: Family) -> bool {
        self.families().contains(&family)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOrderKind::Sales => "sales",
            ChangeOrderKind::Construction => "construction",
            ChangeOrderKind::Plan => "plan",
            ChangeOrderKind::LotTransfer => "lotTransfer",
            ChangeOrderKind::NonStandard => "nonStandard",
        }
    }

    /// Parse from the wire name; unknown names are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for ChangeOrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a change order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrderStatus {
    Pending,
    OutForSignature,
    Signed,
    Approved,
    Rejected,
    Withdrawn,
}

impl ChangeOrderStatus {
    /// An open change order is one still being edited; at most one per job.
    pub fn is_open(&self) -> bool {
        matches!(self, ChangeOrderStatus::Pending)
    }

    /// Whether Add entries of a change order in this status are locked in.
    pub fn locks_additions(&self) -> bool {
        !matches!(
            self,
            ChangeOrderStatus::Pending | ChangeOrderStatus::Withdrawn
        )
    }
}

/// A change order as seen by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOrder {
    /// Persistence id; `None` until the batch is first saved
    #[serde(default)]
    pub id: Option<i64>,
    pub job_id: i64,
    pub kind: ChangeOrderKind,
    pub status: ChangeOrderStatus,
    /// Committed-state version the deltas were computed against
    #[serde(default)]
    pub base_version: u64,
    #[serde(default)]
    pub deltas: Vec<Delta>,
}

impl ChangeOrder {
    /// Check every delta belongs to this kind's schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDelta` naming the first foreign family.
    pub fn validate_schema(&self) -> Result<()> {
        match self.deltas.iter().find(|d| !self.kind.accepts(d.family)) {
            Some(foreign) => Err(JobDeltaError::InvalidDelta {
                family: foreign.family,
                reason: format!("not part of a {} change order", self.kind),
            }),
            None => Ok(()),
        }
    }

    /// Deltas of `family` with the given action, top-level only
    pub fn deltas_of(&self, family: Family, action: Action) -> impl Iterator<Item = &Delta> {
        self.deltas
            .iter()
            .filter(move |d| d.family == family && d.action == action)
    }

    /// SHA-256 digest of the canonical JSON of the delta batch.
    ///
    /// Two submissions with byte-identical deltas share a digest, which lets
    /// the persistence layer recognise a resubmission of the same batch.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the deltas cannot be encoded.
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_string(&self.deltas)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::Identity;

    fn order(kind: ChangeOrderKind, deltas: Vec<Delta>) -> ChangeOrder {
        ChangeOrder {
            id: Some(1),
            job_id: 10,
            kind,
            status: ChangeOrderStatus::Pending,
            base_version: 3,
            deltas,
        }
    }

    #[test]
    fn test_kind_round_trips_through_wire_name() {
        for kind in ChangeOrderKind::ALL {
            assert_eq!(ChangeOrderKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChangeOrderKind::parse("warranty"), None);
    }

    #[test]
    fn test_status_lock_rules() {
        assert!(ChangeOrderStatus::Pending.is_open());
        assert!(!ChangeOrderStatus::Approved.is_open());
        assert!(!ChangeOrderStatus::Pending.locks_additions());
        assert!(!ChangeOrderStatus::Withdrawn.locks_additions());
        assert!(ChangeOrderStatus::Approved.locks_additions());
        assert!(ChangeOrderStatus::OutForSignature.locks_additions());
    }

    #[test]
    fn test_schema_rejects_foreign_family() {
        let co = order(
            ChangeOrderKind::Sales,
            vec![Delta::add(Family::Plan, Identity::Id(7), Default::default())],
        );
        let err = co.validate_schema().unwrap_err();
        assert!(matches!(
            err,
            JobDeltaError::InvalidDelta {
                family: Family::Plan,
                ..
            }
        ));
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = order(
            ChangeOrderKind::Plan,
            vec![Delta::add(Family::Plan, Identity::Id(7), Default::default())],
        );
        let b = order(
            ChangeOrderKind::Plan,
            vec![Delta::add(Family::Plan, Identity::Id(8), Default::default())],
        );
        assert_eq!(a.digest().unwrap(), a.clone().digest().unwrap());
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
        assert_eq!(a.digest().unwrap().len(), 64);
    }
}
