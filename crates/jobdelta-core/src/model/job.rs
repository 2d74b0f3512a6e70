use serde::{Deserialize, Serialize};

use super::catalog::{canonical_options, Choice, JobOption};

/// A buyer on the sales agreement
///
/// Identity is the contact-association id. `is_primary` and `sort_key`
/// describe the buyer's role/position; exchanging them between buyers is a
/// swap, not a field edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub contact_association_id: i64,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_key: i32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Buyer {
    pub fn new(
        contact_association_id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            contact_association_id,
            is_primary: false,
            sort_key: 0,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
        }
    }

    pub fn key(&self) -> i64 {
        self.contact_association_id
    }
}

/// A free-text option request that has no catalog counterpart
///
/// Keyed by the request id assigned when the request was raised; that id
/// is stable across change-order submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonStandardOption {
    pub request_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
}

impl NonStandardOption {
    pub fn key(&self) -> i64 {
        self.request_id
    }
}

/// The reconcilable view of a job
///
/// One shape serves three roles: the committed configuration of the job,
/// the desired configuration coming from the live tree, and the effective
/// state produced by replaying deltas onto the committed baseline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Job-level selected options
    #[serde(default)]
    pub options: Vec<JobOption>,

    #[serde(default)]
    pub buyers: Vec<Buyer>,

    #[serde(default)]
    pub trust_name: Option<String>,

    #[serde(default)]
    pub handing: Option<String>,

    #[serde(default)]
    pub plan_id: Option<i64>,

    #[serde(default)]
    pub lot_id: Option<i64>,

    #[serde(default)]
    pub non_standard_options: Vec<NonStandardOption>,
}

/// Last contractually binding configuration of a job
pub type CommittedState = JobState;

/// In-progress configuration from the live tree
pub type DesiredState = JobState;

/// Committed state with accepted deltas replayed onto it
pub type EffectiveState = JobState;

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comparable form of this state.
    ///
    /// Zero-quantity items are dropped, blank trust/handing collapse to
    /// absent and every collection is ordered by identity key.
    pub fn canonical(mut self) -> Self {
        self.choices = self
            .choices
            .into_iter()
            .filter(|c| c.quantity > 0)
            .map(Choice::canonical)
            .collect();
        self.choices.sort_by_key(Choice::key);

        self.options = canonical_options(self.options);

        self.buyers.sort_by_key(Buyer::key);

        self.trust_name = non_blank(self.trust_name);
        self.handing = non_blank(self.handing);

        self.non_standard_options.retain(|n| n.quantity > 0);
        self.non_standard_options.sort_by_key(NonStandardOption::key);
        self
    }

    /// Look up a selected choice by catalog id
    pub fn choice(&self, catalog_id: i64) -> Option<&Choice> {
        self.choices.iter().find(|c| c.catalog_id == catalog_id)
    }

    /// Look up a buyer by contact-association id
    pub fn buyer(&self, contact_association_id: i64) -> Option<&Buyer> {
        self.buyers
            .iter()
            .find(|b| b.contact_association_id == contact_association_id)
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
