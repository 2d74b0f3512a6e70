//! Delta output types.
//!
//! A delta is the unit of change for one entity of one family. Field maps use
//! `BTreeMap` so serialized deltas are byte-stable for identical input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar fields carried by a delta, keyed by camelCase wire name
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Entity family a delta belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Family {
    Choice,
    Option,
    Attribute,
    Location,
    Buyer,
    Trust,
    Handing,
    Plan,
    Lot,
    NonStandardOption,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Choice => "choice",
            Family::Option => "option",
            Family::Attribute => "attribute",
            Family::Location => "location",
            Family::Buyer => "buyer",
            Family::Trust => "trust",
            Family::Handing => "handing",
            Family::Plan => "plan",
            Family::Lot => "lot",
            Family::NonStandardOption => "nonStandardOption",
        }
    }

    /// Single-valued families never emit `Change`.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            Family::Trust | Family::Handing | Family::Plan | Family::Lot
        )
    }

    /// Families that only appear nested inside another delta
    pub fn is_nested_only(&self) -> bool {
        matches!(self, Family::Attribute | Family::Location)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Add,
    Change,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Add => "Add",
            Action::Change => "Change",
            Action::Delete => "Delete",
        };
        f.write_str(s)
    }
}

/// Stable identity of the entity a delta targets.
///
/// Serialized untagged: a number, a two-element array, a string, or `null`
/// for families holding at most one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    Id(i64),
    Pair(i64, i64),
    Key(String),
    Singleton,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Id(id) => write!(f, "{}", id),
            Identity::Pair(group, id) => write!(f, "({}, {})", group, id),
            Identity::Key(key) => f.write_str(key),
            Identity::Singleton => f.write_str("singleton"),
        }
    }
}

/// Nested deltas, one list per child collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaChildren {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Delta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Delta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Delta>,
}

impl DeltaChildren {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.attributes.is_empty() && self.locations.is_empty()
    }

    /// Number of deltas at every nesting level below this one
    pub fn total(&self) -> usize {
        self.options
            .iter()
            .chain(&self.attributes)
            .chain(&self.locations)
            .map(|d| 1 + d.children.total())
            .sum()
    }
}

/// Decision-point tags carried on choice deltas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaFlags {
    #[serde(default)]
    pub is_elevation: bool,
    #[serde(default)]
    pub is_color_scheme: bool,
}

impl DeltaFlags {
    pub fn is_empty(&self) -> bool {
        !self.is_elevation && !self.is_color_scheme
    }
}

/// One classified Add/Change/Delete record
///
/// - `Add` carries the full scalar payload and `Add` children for every nested item.
/// - `Change` carries only the scalar fields that differ plus nested deltas.
/// - `Delete` carries the last known payload and cascades `Delete` to every nested item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub family: Family,
    pub identity: Identity,
    pub action: Action,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "DeltaChildren::is_empty")]
    pub children: DeltaChildren,
    #[serde(default, skip_serializing_if = "DeltaFlags::is_empty")]
    pub flags: DeltaFlags,
}

impl Delta {
    pub fn new(family: Family, identity: Identity, action: Action, fields: Fields) -> Self {
        Self {
            family,
            identity,
            action,
            fields,
            children: DeltaChildren::default(),
            flags: DeltaFlags::default(),
        }
    }

    pub fn add(family: Family, identity: Identity, fields: Fields) -> Self {
        Self::new(family, identity, Action::Add, fields)
    }

    pub fn change(family: Family, identity: Identity, fields: Fields) -> Self {
        Self::new(family, identity, Action::Change, fields)
    }

    pub fn delete(family: Family, identity: Identity, fields: Fields) -> Self {
        Self::new(family, identity, Action::Delete, fields)
    }

    pub fn with_children(mut self, children: DeltaChildren) -> Self {
        self.children = children;
        self
    }

    pub fn with_flags(mut self, flags: DeltaFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether this delta targets `identity` in `family`
    pub fn targets(&self, family: Family, identity: &Identity) -> bool {
        self.family == family && &self.identity == identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_wire_forms() {
        assert_eq!(serde_json::to_value(Identity::Id(5)).unwrap(), json!(5));
        assert_eq!(serde_json::to_value(Identity::Pair(1, 2)).unwrap(), json!([1, 2]));
        assert_eq!(serde_json::to_value(Identity::Key("L".into())).unwrap(), json!("L"));
        assert_eq!(serde_json::to_value(Identity::Singleton).unwrap(), json!(null));

        let parsed: Identity = serde_json::from_value(json!([3, 4])).unwrap();
        assert_eq!(parsed, Identity::Pair(3, 4));
        let parsed: Identity = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(parsed, Identity::Singleton);
    }

    #[test]
    fn test_delta_omits_empty_children_and_flags() {
        let delta = Delta::delete(Family::Plan, Identity::Id(5), Fields::new());
        let value = serde_json::to_value(&delta).unwrap();
        assert_eq!(
            value,
            json!({"family": "plan", "identity": 5, "action": "Delete", "fields": {}})
        );
    }

    #[test]
    fn test_children_total_counts_nested_levels() {
        let attr = Delta::add(Family::Attribute, Identity::Pair(1, 1), Fields::new());
        let option = Delta::add(Family::Option, Identity::Id(9), Fields::new()).with_children(
            DeltaChildren {
                attributes: vec![attr],
                ..Default::default()
            },
        );
        let children = DeltaChildren {
            options: vec![option],
            ..Default::default()
        };
        assert_eq!(children.total(), 2);
    }

    #[test]
    fn test_family_wire_names() {
        assert_eq!(
            serde_json::to_value(Family::NonStandardOption).unwrap(),
            json!("nonStandardOption")
        );
        assert!(Family::Lot.is_singleton());
        assert!(!Family::Buyer.is_singleton());
    }
}
