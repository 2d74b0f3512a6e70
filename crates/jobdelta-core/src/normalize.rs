//! Entity normalizer
//!
//! Source systems hand over two record shapes for the same entities: rows of
//! the committed job, and rows of a change order that additionally carry an
//! `action`. Both are deserialized through [`Record`], which settles which
//! shape a row has once, at this boundary. Everything past this module works
//! on the canonical model and typed deltas only.
//!
//! Surrogate row ids are accepted on input and dropped; identity is always the
//! catalog or external key.

use serde::{Deserialize, Deserializer};

use crate::diff::engine::{added, deleted, scalar_fields, Reconcilable};
use crate::diff::model::{Action, Delta, DeltaChildren};
use crate::errors::{JobDeltaError, Result};
use crate::model::{
    Attribute, Buyer, ChangeOrder, ChangeOrderKind, ChangeOrderStatus, Choice, CommittedState,
    DecisionPointType, JobOption, JobState, Location, NonStandardOption,
};

/// A source row, either as committed or as proposed by a change order
#[derive(Debug, Clone, PartialEq)]
pub enum Record<T> {
    Committed(T),
    Proposed(T, Action),
}

impl<T> Record<T> {
    pub fn inner(&self) -> &T {
        match self {
            Record::Committed(row) | Record::Proposed(row, _) => row,
        }
    }

    pub fn action(&self) -> Option<Action> {
        match self {
            Record::Committed(_) => None,
            Record::Proposed(_, action) => Some(*action),
        }
    }
}

#[derive(Deserialize)]
struct TaggedRow<T> {
    #[serde(default)]
    action: Option<Action>,
    #[serde(flatten)]
    row: T,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Record<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tagged = TaggedRow::<T>::deserialize(deserializer)?;
        Ok(match tagged.action {
            Some(action) => Record::Proposed(tagged.row, action),
            None => Record::Committed(tagged.row),
        })
    }
}

// ---------------------------------------------------------------------------
// Source row shapes
// ---------------------------------------------------------------------------

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    /// Surrogate row id, re-minted per submission
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(alias = "dpchId")]
    pub catalog_id: i64,
    #[serde(default, alias = "choiceLabel")]
    pub label: String,
    #[serde(default, alias = "dpId")]
    pub decision_point_id: i64,
    #[serde(default)]
    pub decision_point_type: DecisionPointType,
    /// Rows without a quantity are single selections; 0 means deselected
    #[serde(default = "one", alias = "dpchQuantity")]
    pub quantity: u32,
    #[serde(default, alias = "dpchPrice")]
    pub list_price: f64,
    #[serde(default)]
    pub override_note: Option<String>,
    #[serde(default)]
    pub options: Vec<Record<OptionRecord>>,
    #[serde(default, alias = "selectedAttributes")]
    pub attributes: Vec<Record<AttributeRecord>>,
    #[serde(default, alias = "selectedLocations")]
    pub locations: Vec<Record<LocationRecord>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(alias = "planOptionId")]
    pub catalog_id: i64,
    #[serde(default)]
    pub integration_key: String,
    /// Option rows without a quantity are single selections
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub list_price: f64,
    #[serde(default)]
    pub is_base_house: bool,
    #[serde(default)]
    pub attributes: Vec<Record<AttributeRecord>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub attribute_group_id: i64,
    pub attribute_id: i64,
    #[serde(default, alias = "attributeName")]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub location_group_id: i64,
    pub location_id: i64,
    #[serde(default = "one", alias = "locationQuantity")]
    pub quantity: u32,
    #[serde(default)]
    pub attributes: Vec<Record<AttributeRecord>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub contact_association_id: i64,
    #[serde(default, alias = "isPrimaryBuyer")]
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

/// A committed job as delivered by the persistence layer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub choices: Vec<Record<ChoiceRecord>>,
    #[serde(default)]
    pub options: Vec<Record<OptionRecord>>,
    #[serde(default)]
    pub buyers: Vec<Record<BuyerRecord>>,
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

/// A change order as delivered by the persistence layer
///
/// Row-shaped families arrive as action-tagged rows; the remaining families
/// arrive as already-typed deltas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOrderRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub job_id: i64,
    pub kind: ChangeOrderKind,
    pub status: ChangeOrderStatus,
    #[serde(default)]
    pub base_version: u64,
    #[serde(default)]
    pub choices: Vec<Record<ChoiceRecord>>,
    #[serde(default)]
    pub options: Vec<Record<OptionRecord>>,
    #[serde(default)]
    pub buyers: Vec<Record<BuyerRecord>>,
    #[serde(default)]
    pub deltas: Vec<Delta>,
}

// ---------------------------------------------------------------------------
// Row -> canonical entity
// ---------------------------------------------------------------------------

/// A source row that maps onto one canonical entity
trait SourceRow {
    type Target: Reconcilable;

    /// Canonical entity, nested rows included unless proposed for deletion
    fn to_target(&self) -> Self::Target;

    /// Child deltas from the explicitly tagged nested rows
    fn child_deltas(&self) -> Result<DeltaChildren> {
        Ok(DeltaChildren::default())
    }

    /// Fail if any nested row carries an action
    fn ensure_committed(&self) -> Result<()> {
        Ok(())
    }
}

fn nested<R: SourceRow>(rows: &[Record<R>]) -> Vec<R::Target> {
    rows.iter()
        .filter(|r| r.action() != Some(Action::Delete))
        .map(|r| r.inner().to_target())
        .collect()
}

fn nested_deltas<R: SourceRow>(rows: &[Record<R>]) -> Result<Vec<Delta>> {
    let mut deltas = Vec::new();
    for row in rows {
        if let Some(delta) = row_delta(row)? {
            deltas.push(delta);
        }
    }
    Ok(deltas)
}

fn committed_rows<R: SourceRow>(rows: &[Record<R>]) -> Result<Vec<R::Target>> {
    rows.iter()
        .map(|row| match row {
            Record::Committed(inner) => {
                inner.ensure_committed()?;
                Ok(inner.to_target())
            }
            Record::Proposed(inner, action) => Err(JobDeltaError::InvalidRecordShape {
                reason: format!(
                    "{} {} carries action {} in a committed record",
                    <R::Target as Reconcilable>::FAMILY,
                    inner.to_target().identity(),
                    action
                ),
            }),
        })
        .collect()
}

/// Delta for one row; untagged rows are unchanged context and yield `None`.
fn row_delta<R: SourceRow>(row: &Record<R>) -> Result<Option<Delta>> {
    let Record::Proposed(inner, action) = row else {
        return Ok(None);
    };
    let target = inner.to_target();
    let delta = match action {
        Action::Add => added(&target)?,
        Action::Delete => deleted(&target)?,
        Action::Change => {
            let family = <R::Target as Reconcilable>::FAMILY;
            Delta::change(family, target.identity(), scalar_fields(&target)?)
                .with_children(inner.child_deltas()?)
                .with_flags(target.flags())
        }
    };
    Ok(Some(delta))
}

impl SourceRow for AttributeRecord {
    type Target = Attribute;

    fn to_target(&self) -> Attribute {
        Attribute {
            attribute_group_id: self.attribute_group_id,
            attribute_id: self.attribute_id,
            name: self.name.clone(),
            sku: self.sku.clone(),
            manufacturer: self.manufacturer.clone(),
        }
    }
}

fn attribute_deltas(rows: &[Record<AttributeRecord>]) -> Result<DeltaChildren> {
    Ok(DeltaChildren {
        attributes: nested_deltas(rows)?,
        ..DeltaChildren::default()
    })
}

fn attributes_committed(rows: &[Record<AttributeRecord>]) -> Result<()> {
    committed_rows(rows).map(|_| ())
}

impl SourceRow for OptionRecord {
    type Target = JobOption;

    fn to_target(&self) -> JobOption {
        JobOption {
            catalog_id: self.catalog_id,
            integration_key: self.integration_key.clone(),
            quantity: self.quantity,
            list_price: self.list_price,
            is_base_house: self.is_base_house,
            attributes: nested(&self.attributes),
        }
    }

    fn child_deltas(&self) -> Result<DeltaChildren> {
        attribute_deltas(&self.attributes)
    }

    fn ensure_committed(&self) -> Result<()> {
        attributes_committed(&self.attributes)
    }
}

impl SourceRow for LocationRecord {
    type Target = Location;

    fn to_target(&self) -> Location {
        Location {
            location_group_id: self.location_group_id,
            location_id: self.location_id,
            quantity: self.quantity,
            attributes: nested(&self.attributes),
        }
    }

    fn child_deltas(&self) -> Result<DeltaChildren> {
        attribute_deltas(&self.attributes)
    }

    fn ensure_committed(&self) -> Result<()> {
        attributes_committed(&self.attributes)
    }
}

impl SourceRow for ChoiceRecord {
    type Target = Choice;

    fn to_target(&self) -> Choice {
        Choice {
            catalog_id: self.catalog_id,
            label: self.label.clone(),
            decision_point_id: self.decision_point_id,
            decision_point_type: self.decision_point_type,
            quantity: self.quantity,
            list_price: self.list_price,
            override_note: self.override_note.clone(),
            options: nested(&self.options),
            attributes: nested(&self.attributes),
            locations: nested(&self.locations),
        }
    }

    fn child_deltas(&self) -> Result<DeltaChildren> {
        Ok(DeltaChildren {
            options: nested_deltas(&self.options)?,
            attributes: nested_deltas(&self.attributes)?,
            locations: nested_deltas(&self.locations)?,
        })
    }

    fn ensure_committed(&self) -> Result<()> {
        committed_rows(&self.options)?;
        committed_rows(&self.attributes)?;
        committed_rows(&self.locations)?;
        Ok(())
    }
}

impl SourceRow for BuyerRecord {
    type Target = Buyer;

    fn to_target(&self) -> Buyer {
        Buyer {
            contact_association_id: self.contact_association_id,
            is_primary: self.is_primary,
            sort_key: self.sort_key,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Canonical committed state of a job.
///
/// # Errors
///
/// `InvalidRecordShape` if any row, at any depth, carries an `action`.
pub fn committed_state(job: JobRecord) -> Result<CommittedState> {
    let state = JobState {
        choices: committed_rows(&job.choices)?,
        options: committed_rows(&job.options)?,
        buyers: committed_rows(&job.buyers)?,
        trust_name: job.trust_name,
        handing: job.handing,
        plan_id: job.plan_id,
        lot_id: job.lot_id,
        non_standard_options: job.non_standard_options,
    };
    Ok(state.canonical())
}

/// Nested deltas for the choice rows of an open change order.
///
/// Nested rows without an action inherit Add/Delete from an added or deleted
/// parent (rows proposed for deletion under an added parent are left out)
/// and are skipped under a changed parent. Untagged top-level rows are
/// unchanged context and produce nothing.
///
/// # Errors
///
/// `Serialization` if a row cannot be encoded as delta fields.
pub fn proposed_deltas(rows: &[Record<ChoiceRecord>]) -> Result<Vec<Delta>> {
    nested_deltas(rows)
}

/// Typed change order from its source record.
///
/// # Errors
///
/// `InvalidDelta` if a delta falls outside the kind's families.
pub fn change_order(record: ChangeOrderRecord) -> Result<ChangeOrder> {
    let mut deltas = nested_deltas(&record.choices)?;
    deltas.extend(nested_deltas(&record.options)?);
    deltas.extend(nested_deltas(&record.buyers)?);
    deltas.extend(record.deltas);

    let change_order = ChangeOrder {
        id: record.id,
        job_id: record.job_id,
        kind: record.kind,
        status: record.status,
        base_version: record.base_version,
        deltas,
    };
    change_order.validate_schema()?;
    Ok(change_order)
}
