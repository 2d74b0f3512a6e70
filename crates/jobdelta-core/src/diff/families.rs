//! Family adapters.
//!
//! Each top-level family of a [`JobState`] gets an adapter that knows where
//! its records live and which diff policy applies:
//!
//! | Family | Identity | Policy |
//! |---|---|---|
//! | choice | catalog id | generic, nested options/attributes/locations, decision-point flags |
//! | option | catalog id | generic, nested attributes |
//! | buyer | contact-association id | swap as Delete+Add, name edit as Change, independently |
//! | trust | singleton | Delete+Add / bare Add / bare Delete |
//! | handing, plan, lot | the value itself | Delete+Add / bare Add / bare Delete |
//! | nonStandardOption | request id | generic |

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

use jobdelta_core_types::Sensitive;

use crate::diff::engine::{
    added, added_all, apply_family, changed_fields, deleted, deleted_all, diff_family, index,
    scalar_fields, Reconcilable,
};
use crate::diff::model::{Action, Delta, DeltaChildren, DeltaFlags, Family, Fields, Identity};
use crate::errors::{JobDeltaError, Result};
use crate::model::{Buyer, Choice, JobState, NonStandardOption};

/// Top-level families in the order their deltas are emitted by a full diff
pub const TOP_LEVEL_FAMILIES: [Family; 8] = [
    Family::Choice,
    Family::Option,
    Family::Buyer,
    Family::Trust,
    Family::Handing,
    Family::Plan,
    Family::Lot,
    Family::NonStandardOption,
];

fn id_of(identity: &Identity) -> Option<i64> {
    match identity {
        Identity::Id(id) => Some(*id),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Choice
// ---------------------------------------------------------------------------

impl Reconcilable for Choice {
    type Key = i64;
    const FAMILY: Family = Family::Choice;
    const CHILD_KEYS: &'static [&'static str] = &["options", "attributes", "locations"];

    fn key(&self) -> i64 {
        self.catalog_id
    }

    fn identity(&self) -> Identity {
        Identity::Id(self.catalog_id)
    }

    fn key_of(identity: &Identity) -> Option<i64> {
        id_of(identity)
    }

    fn is_present(&self) -> bool {
        self.quantity > 0
    }

    /// The base-house option is never reported as removed from a choice.
    fn children_diff(committed: &Self, desired: &Self) -> Result<DeltaChildren> {
        let base_house: BTreeSet<i64> = committed
            .options
            .iter()
            .filter(|o| o.is_base_house)
            .map(|o| o.catalog_id)
            .collect();
        let mut options = diff_family(&committed.options, &desired.options)?;
        options.retain(|d| {
            d.action != Action::Delete
                || id_of(&d.identity).map_or(true, |id| !base_house.contains(&id))
        });

        Ok(DeltaChildren {
            options,
            attributes: diff_family(&committed.attributes, &desired.attributes)?,
            locations: diff_family(&committed.locations, &desired.locations)?,
        })
    }

    fn children_added(&self) -> Result<DeltaChildren> {
        Ok(DeltaChildren {
            options: added_all(&self.options)?,
            attributes: added_all(&self.attributes)?,
            locations: added_all(&self.locations)?,
        })
    }

    fn children_deleted(&self) -> Result<DeltaChildren> {
        Ok(DeltaChildren {
            options: deleted_all(&self.options)?,
            attributes: deleted_all(&self.attributes)?,
            locations: deleted_all(&self.locations)?,
        })
    }

    fn apply_children(&mut self, children: &DeltaChildren) -> Result<()> {
        apply_family(&mut self.options, &children.options)?;
        apply_family(&mut self.attributes, &children.attributes)?;
        apply_family(&mut self.locations, &children.locations)
    }

    fn flags(&self) -> DeltaFlags {
        DeltaFlags {
            is_elevation: self.is_elevation(),
            is_color_scheme: self.is_color_scheme(),
        }
    }
}

// ---------------------------------------------------------------------------
// Buyer
// ---------------------------------------------------------------------------

const BUYER_NAME_FIELDS: &[&str] = &["firstName", "lastName", "email"];

impl Reconcilable for Buyer {
    type Key = i64;
    const FAMILY: Family = Family::Buyer;

    fn key(&self) -> i64 {
        self.contact_association_id
    }

    fn identity(&self) -> Identity {
        Identity::Id(self.contact_association_id)
    }

    fn key_of(identity: &Identity) -> Option<i64> {
        id_of(identity)
    }
}

/// A change of role or position between buyers
fn is_swap(committed: &Buyer, desired: &Buyer) -> bool {
    committed.is_primary != desired.is_primary || committed.sort_key != desired.sort_key
}

/// Diff buyers.
///
/// The swap detector and the name detector run independently: a buyer whose
/// role and name both changed yields Delete, Add and Change, in that order.
/// Replaying the Change after the Add rewrites the same name values.
pub fn diff_buyers(committed: &[Buyer], desired: &[Buyer]) -> Result<Vec<Delta>> {
    let committed = index(committed, "committed")?;
    let desired = index(desired, "desired")?;
    let keys: BTreeSet<&i64> = committed.keys().chain(desired.keys()).collect();

    let mut deletes = Vec::new();
    let mut upserts = Vec::new();

    for key in keys {
        match (committed.get(key), desired.get(key)) {
            (Some(old), None) => deletes.push(deleted(*old)?),
            (None, Some(new)) => upserts.push(added(*new)?),
            (Some(old), Some(new)) => {
                if is_swap(old, new) {
                    deletes.push(deleted(*old)?);
                    upserts.push(added(*new)?);
                }
                let renamed: Fields =
                    changed_fields(&scalar_fields(*old)?, &scalar_fields(*new)?)
                        .into_iter()
                        .filter(|(k, _)| BUYER_NAME_FIELDS.contains(&k.as_str()))
                        .collect();
                if !renamed.is_empty() {
                    tracing::debug!(
                        family = Family::Buyer.as_str(),
                        identity = *key,
                        name = %Sensitive::new(format!("{} {}", new.first_name, new.last_name)),
                        "buyer renamed"
                    );
                    upserts.push(Delta::change(Family::Buyer, new.identity(), renamed));
                }
            }
            (None, None) => {}
        }
    }

    deletes.extend(upserts);
    Ok(deletes)
}

// ---------------------------------------------------------------------------
// Non-standard option
// ---------------------------------------------------------------------------

impl Reconcilable for NonStandardOption {
    type Key = i64;
    const FAMILY: Family = Family::NonStandardOption;

    fn key(&self) -> i64 {
        self.request_id
    }

    fn identity(&self) -> Identity {
        Identity::Id(self.request_id)
    }

    fn key_of(identity: &Identity) -> Option<i64> {
        id_of(identity)
    }

    fn is_present(&self) -> bool {
        self.quantity > 0
    }
}

// ---------------------------------------------------------------------------
// Singletons
// ---------------------------------------------------------------------------

/// Shape of a single-valued family: its family tag, the field carrying the
/// value, and how the value maps to a delta identity.
struct SingletonSlot<V> {
    family: Family,
    field: &'static str,
    identity: fn(&V) -> Identity,
}

impl<V> SingletonSlot<V>
where
    V: Serialize + DeserializeOwned + PartialEq,
{
    fn delta(&self, action: Action, value: &V) -> Result<Delta> {
        let mut fields = Fields::new();
        fields.insert(self.field.to_string(), serde_json::to_value(value)?);
        Ok(Delta::new(self.family, (self.identity)(value), action, fields))
    }

    /// Never emits Change: a replaced value is Delete(old) then Add(new).
    fn diff(&self, committed: Option<&V>, desired: Option<&V>) -> Result<Vec<Delta>> {
        if committed == desired {
            return Ok(Vec::new());
        }
        let mut deltas = Vec::new();
        if let Some(old) = committed {
            deltas.push(self.delta(Action::Delete, old)?);
        }
        if let Some(new) = desired {
            deltas.push(self.delta(Action::Add, new)?);
        }
        Ok(deltas)
    }

    fn apply(&self, slot: &mut Option<V>, deltas: &[Delta]) -> Result<()> {
        for delta in deltas {
            if delta.family != self.family {
                return Err(JobDeltaError::InvalidDelta {
                    family: delta.family,
                    reason: format!("found among {} deltas", self.family),
                });
            }
            match delta.action {
                Action::Delete => {
                    let matches = slot
                        .as_ref()
                        .is_some_and(|v| (self.identity)(v) == delta.identity);
                    if matches {
                        *slot = None;
                    } else {
                        tracing::warn!(
                            family = self.family.as_str(),
                            identity = %delta.identity,
                            "delete target not in baseline; skipping"
                        );
                    }
                }
                Action::Add => {
                    let raw = delta.fields.get(self.field).cloned().ok_or_else(|| {
                        JobDeltaError::InvalidDelta {
                            family: self.family,
                            reason: format!("Add is missing '{}'", self.field),
                        }
                    })?;
                    let value: V =
                        serde_json::from_value(raw).map_err(|e| JobDeltaError::InvalidDelta {
                            family: self.family,
                            reason: format!("'{}' has the wrong type: {}", self.field, e),
                        })?;
                    if (self.identity)(&value) != delta.identity {
                        return Err(JobDeltaError::InvalidDelta {
                            family: self.family,
                            reason: format!(
                                "'{}' does not match identity {}",
                                self.field, delta.identity
                            ),
                        });
                    }
                    *slot = Some(value);
                }
                Action::Change => {
                    return Err(JobDeltaError::InvalidDelta {
                        family: self.family,
                        reason: "single-valued families are replaced with Delete+Add, never changed"
                            .to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

#[allow(clippy::ptr_arg)]
fn singleton_identity(_: &String) -> Identity {
    Identity::Singleton
}

#[allow(clippy::ptr_arg)]
fn key_identity(value: &String) -> Identity {
    Identity::Key(value.clone())
}

fn id_identity(value: &i64) -> Identity {
    Identity::Id(*value)
}

const TRUST: SingletonSlot<String> = SingletonSlot {
    family: Family::Trust,
    field: "trustName",
    identity: singleton_identity,
};

const HANDING: SingletonSlot<String> = SingletonSlot {
    family: Family::Handing,
    field: "handing",
    identity: key_identity,
};

const PLAN: SingletonSlot<i64> = SingletonSlot {
    family: Family::Plan,
    field: "planId",
    identity: id_identity,
};

const LOT: SingletonSlot<i64> = SingletonSlot {
    family: Family::Lot,
    field: "lotId",
    identity: id_identity,
};

fn non_blank(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Per-family policy over a whole job state
pub trait FamilyAdapter: Send + Sync {
    fn family(&self) -> Family;

    /// Deltas turning `committed` into `desired` for this family.
    ///
    /// # Errors
    ///
    /// `InconsistentIdentity` on duplicate keys.
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>>;

    /// Replay this family's deltas, in order, onto `state`.
    ///
    /// # Errors
    ///
    /// `InvalidDelta` or `DeltaTargetMissing` as for [`apply_family`].
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()>;
}

pub struct ChoiceAdapter;
pub struct OptionAdapter;
pub struct BuyerAdapter;
pub struct TrustAdapter;
pub struct HandingAdapter;
pub struct PlanAdapter;
pub struct LotAdapter;
pub struct NonStandardOptionAdapter;

impl FamilyAdapter for ChoiceAdapter {
    fn family(&self) -> Family {
        Family::Choice
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        diff_family(&committed.choices, &desired.choices)
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        apply_family(&mut state.choices, deltas)
    }
}

impl FamilyAdapter for OptionAdapter {
    fn family(&self) -> Family {
        Family::Option
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        diff_family(&committed.options, &desired.options)
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        apply_family(&mut state.options, deltas)
    }
}

impl FamilyAdapter for BuyerAdapter {
    fn family(&self) -> Family {
        Family::Buyer
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        diff_buyers(&committed.buyers, &desired.buyers)
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        apply_family(&mut state.buyers, deltas)
    }
}

impl FamilyAdapter for TrustAdapter {
    fn family(&self) -> Family {
        Family::Trust
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        let deltas = TRUST.diff(non_blank(&committed.trust_name), non_blank(&desired.trust_name))?;
        if !deltas.is_empty() {
            tracing::debug!(
                family = Family::Trust.as_str(),
                trust_name = %Sensitive::new(desired.trust_name.clone().unwrap_or_default()),
                "trust name differs"
            );
        }
        Ok(deltas)
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        TRUST.apply(&mut state.trust_name, deltas)
    }
}

impl FamilyAdapter for HandingAdapter {
    fn family(&self) -> Family {
        Family::Handing
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        HANDING.diff(non_blank(&committed.handing), non_blank(&desired.handing))
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        HANDING.apply(&mut state.handing, deltas)
    }
}

impl FamilyAdapter for PlanAdapter {
    fn family(&self) -> Family {
        Family::Plan
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        PLAN.diff(committed.plan_id.as_ref(), desired.plan_id.as_ref())
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        PLAN.apply(&mut state.plan_id, deltas)
    }
}

impl FamilyAdapter for LotAdapter {
    fn family(&self) -> Family {
        Family::Lot
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        LOT.diff(committed.lot_id.as_ref(), desired.lot_id.as_ref())
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        LOT.apply(&mut state.lot_id, deltas)
    }
}

impl FamilyAdapter for NonStandardOptionAdapter {
    fn family(&self) -> Family {
        Family::NonStandardOption
    }
    fn diff(&self, committed: &JobState, desired: &JobState) -> Result<Vec<Delta>> {
        diff_family(&committed.non_standard_options, &desired.non_standard_options)
    }
    fn apply(&self, state: &mut JobState, deltas: &[Delta]) -> Result<()> {
        apply_family(&mut state.non_standard_options, deltas)
    }
}

/// Adapter for a top-level family; `None` for nested-only families.
pub fn adapter_for(family: Family) -> Option<&'static dyn FamilyAdapter> {
    match family {
        Family::Choice => Some(&ChoiceAdapter),
        Family::Option => Some(&OptionAdapter),
        Family::Buyer => Some(&BuyerAdapter),
        Family::Trust => Some(&TrustAdapter),
        Family::Handing => Some(&HandingAdapter),
        Family::Plan => Some(&PlanAdapter),
        Family::Lot => Some(&LotAdapter),
        Family::NonStandardOption => Some(&NonStandardOptionAdapter),
        Family::Attribute | Family::Location => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobOption;
    use serde_json::json;

    fn state() -> JobState {
        JobState::default()
    }

    #[test]
    fn test_plan_swap_is_delete_then_add() {
        let committed = JobState {
            plan_id: Some(5),
            ..state()
        };
        let desired = JobState {
            plan_id: Some(7),
            ..state()
        };
        let deltas = PlanAdapter.diff(&committed, &desired).unwrap();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].action, Action::Delete);
        assert_eq!(deltas[0].identity, Identity::Id(5));
        assert_eq!(deltas[1].action, Action::Add);
        assert_eq!(deltas[1].identity, Identity::Id(7));
    }

    #[test]
    fn test_trust_first_assignment_is_bare_add() {
        let committed = JobState {
            trust_name: Some(String::new()),
            ..state()
        };
        let desired = JobState {
            trust_name: Some("Smith Family Trust".into()),
            ..state()
        };
        let deltas = TrustAdapter.diff(&committed, &desired).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].action, Action::Add);
        assert_eq!(deltas[0].identity, Identity::Singleton);
        assert_eq!(deltas[0].fields["trustName"], json!("Smith Family Trust"));
    }

    #[test]
    fn test_singleton_change_is_rejected_on_apply() {
        let delta = Delta::change(Family::Lot, Identity::Id(3), Fields::new());
        let err = LotAdapter.apply(&mut state(), &[delta]).unwrap_err();
        assert!(matches!(err, JobDeltaError::InvalidDelta { .. }));
    }

    #[test]
    fn test_base_house_option_never_reported_removed() {
        let mut committed = Choice::new(100, 1);
        let mut base = JobOption::new(1, "BASE");
        base.is_base_house = true;
        committed.options = vec![base, JobOption::new(2, "OPT-2")];
        let desired = Choice::new(100, 1);

        let children = Choice::children_diff(&committed, &desired).unwrap();
        assert_eq!(children.options.len(), 1);
        assert_eq!(children.options[0].identity, Identity::Id(2));
    }

    #[test]
    fn test_every_top_level_family_has_an_adapter() {
        for family in TOP_LEVEL_FAMILIES {
            let adapter = adapter_for(family).unwrap();
            assert_eq!(adapter.family(), family);
        }
        assert!(adapter_for(Family::Attribute).is_none());
    }
}
