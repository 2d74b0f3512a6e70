//! Nested attribute/location differ.
//!
//! Options, attributes and locations recurse through the generic engine at
//! each level. Attributes compare exactly, so any difference is a Delete+Add.
//! A deleted option or location cascades Delete to its own attributes.

use crate::diff::engine::{added_all, apply_family, deleted_all, diff_family, Reconcilable};
use crate::diff::model::{Delta, DeltaChildren, Family, Identity};
use crate::errors::Result;
use crate::model::{Attribute, JobOption, Location};

fn pair_of(identity: &Identity) -> Option<(i64, i64)> {
    match identity {
        Identity::Pair(group, id) => Some((*group, *id)),
        _ => None,
    }
}

fn attribute_children(attributes: Vec<Delta>) -> DeltaChildren {
    DeltaChildren {
        attributes,
        ..DeltaChildren::default()
    }
}

impl Reconcilable for Attribute {
    type Key = (i64, i64);
    const FAMILY: Family = Family::Attribute;

    fn key(&self) -> (i64, i64) {
        Attribute::key(self)
    }

    fn identity(&self) -> Identity {
        Identity::Pair(self.attribute_group_id, self.attribute_id)
    }

    fn key_of(identity: &Identity) -> Option<(i64, i64)> {
        pair_of(identity)
    }

    fn replace_on_change() -> bool {
        true
    }
}

impl Reconcilable for JobOption {
    type Key = i64;
    const FAMILY: Family = Family::Option;
    const CHILD_KEYS: &'static [&'static str] = &["attributes"];

    fn key(&self) -> i64 {
        JobOption::key(self)
    }

    fn identity(&self) -> Identity {
        Identity::Id(self.catalog_id)
    }

    fn key_of(identity: &Identity) -> Option<i64> {
        match identity {
            Identity::Id(id) => Some(*id),
            _ => None,
        }
    }

    fn is_present(&self) -> bool {
        self.quantity > 0
    }

    fn children_diff(committed: &Self, desired: &Self) -> Result<DeltaChildren> {
        Ok(attribute_children(diff_family(
            &committed.attributes,
            &desired.attributes,
        )?))
    }

    fn children_added(&self) -> Result<DeltaChildren> {
        Ok(attribute_children(added_all(&self.attributes)?))
    }

    fn children_deleted(&self) -> Result<DeltaChildren> {
        Ok(attribute_children(deleted_all(&self.attributes)?))
    }

    fn apply_children(&mut self, children: &DeltaChildren) -> Result<()> {
        apply_family(&mut self.attributes, &children.attributes)
    }
}

impl Reconcilable for Location {
    type Key = (i64, i64);
    const FAMILY: Family = Family::Location;
    const CHILD_KEYS: &'static [&'static str] = &["attributes"];

    fn key(&self) -> (i64, i64) {
        Location::key(self)
    }

    fn identity(&self) -> Identity {
        Identity::Pair(self.location_group_id, self.location_id)
    }

    fn key_of(identity: &Identity) -> Option<(i64, i64)> {
        pair_of(identity)
    }

    fn is_present(&self) -> bool {
        self.quantity > 0
    }

    fn children_diff(committed: &Self, desired: &Self) -> Result<DeltaChildren> {
        Ok(attribute_children(diff_family(
            &committed.attributes,
            &desired.attributes,
        )?))
    }

    fn children_added(&self) -> Result<DeltaChildren> {
        Ok(attribute_children(added_all(&self.attributes)?))
    }

    fn children_deleted(&self) -> Result<DeltaChildren> {
        Ok(attribute_children(deleted_all(&self.attributes)?))
    }

    fn apply_children(&mut self, children: &DeltaChildren) -> Result<()> {
        apply_family(&mut self.attributes, &children.attributes)
    }
}
