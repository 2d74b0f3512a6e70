//! Generic three-way diff and replay.
//!
//! [`diff_family`] classifies one family's items into Add/Change/Delete by
//! identity key; [`apply_family`] replays such deltas onto a baseline list.
//! Every entity family implements [`Reconcilable`] to plug into both.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::diff::model::{Action, Delta, DeltaChildren, DeltaFlags, Family, Fields, Identity};
use crate::errors::{JobDeltaError, Result};

/// An entity family the generic engine can diff and replay.
///
/// The scalar payload of an item is its serialized form minus
/// [`Reconcilable::CHILD_KEYS`]; nested collections travel as child deltas.
pub trait Reconcilable: Clone + PartialEq + Serialize + DeserializeOwned {
    type Key: Ord + Clone + Debug;

    const FAMILY: Family;

    /// Serialized keys of nested collections
    const CHILD_KEYS: &'static [&'static str] = &[];

    fn key(&self) -> Self::Key;

    fn identity(&self) -> Identity;

    /// Recover the key from a delta identity; `None` if the shape is wrong.
    fn key_of(identity: &Identity) -> Option<Self::Key>;

    /// Items that are not present (e.g. quantity 0) are treated as absent.
    fn is_present(&self) -> bool {
        true
    }

    /// Exact-equality families encode any difference as Delete+Add.
    fn replace_on_change() -> bool {
        false
    }

    fn children_diff(_committed: &Self, _desired: &Self) -> Result<DeltaChildren> {
        Ok(DeltaChildren::default())
    }

    fn children_added(&self) -> Result<DeltaChildren> {
        Ok(DeltaChildren::default())
    }

    fn children_deleted(&self) -> Result<DeltaChildren> {
        Ok(DeltaChildren::default())
    }

    fn apply_children(&mut self, _children: &DeltaChildren) -> Result<()> {
        Ok(())
    }

    fn flags(&self) -> DeltaFlags {
        DeltaFlags::default()
    }
}

/// Scalar payload of an item, keyed by wire name
pub fn scalar_fields<T: Reconcilable>(item: &T) -> Result<Fields> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(k, _)| !T::CHILD_KEYS.contains(&k.as_str()))
            .collect()),
        other => Err(JobDeltaError::InvalidRecordShape {
            reason: format!("{} did not serialize to an object: {}", T::FAMILY, other),
        }),
    }
}

/// Fields whose values differ, carrying the desired value (`null` if dropped)
pub fn changed_fields(committed: &Fields, desired: &Fields) -> Fields {
    let keys: BTreeSet<&String> = committed.keys().chain(desired.keys()).collect();
    keys.into_iter()
        .filter(|k| committed.get(*k) != desired.get(*k))
        .map(|k| (k.clone(), desired.get(k).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// `Add` delta for an item, with every nested child marked `Add`
pub fn added<T: Reconcilable>(item: &T) -> Result<Delta> {
    Ok(Delta::add(T::FAMILY, item.identity(), scalar_fields(item)?)
        .with_children(item.children_added()?)
        .with_flags(item.flags()))
}

/// `Delete` delta carrying the last known payload and cascading to children
pub fn deleted<T: Reconcilable>(item: &T) -> Result<Delta> {
    Ok(Delta::delete(T::FAMILY, item.identity(), scalar_fields(item)?)
        .with_children(item.children_deleted()?)
        .with_flags(item.flags()))
}

/// `Add` deltas for every present item, in key order
pub fn added_all<T: Reconcilable>(items: &[T]) -> Result<Vec<Delta>> {
    index(items, "desired")?.values().map(|i| added(*i)).collect()
}

/// `Delete` deltas for every present item, in key order
pub fn deleted_all<T: Reconcilable>(items: &[T]) -> Result<Vec<Delta>> {
    index(items, "committed")?.values().map(|i| deleted(*i)).collect()
}

/// Present items keyed by identity; duplicates are a fatal data error.
pub(crate) fn index<'a, T: Reconcilable>(
    items: &'a [T],
    side: &'static str,
) -> Result<BTreeMap<T::Key, &'a T>> {
    let mut map = BTreeMap::new();
    for item in items.iter().filter(|i| i.is_present()) {
        if map.insert(item.key(), item).is_some() {
            return Err(JobDeltaError::InconsistentIdentity {
                family: T::FAMILY,
                identity: item.identity().to_string(),
                side,
            });
        }
    }
    Ok(map)
}

/// Three-way diff of one family.
///
/// Output is Deletes in key order followed by Adds and Changes in key order.
/// A matched pair with no scalar and no nested difference is omitted.
///
/// # Errors
///
/// `InconsistentIdentity` if either side holds two present items with one key.
pub fn diff_family<T: Reconcilable>(committed: &[T], desired: &[T]) -> Result<Vec<Delta>> {
    let committed = index(committed, "committed")?;
    let desired = index(desired, "desired")?;
    let keys: BTreeSet<&T::Key> = committed.keys().chain(desired.keys()).collect();

    let mut deletes = Vec::new();
    let mut upserts = Vec::new();

    for key in keys {
        match (committed.get(key), desired.get(key)) {
            (Some(old), None) => deletes.push(deleted(*old)?),
            (None, Some(new)) => upserts.push(added(*new)?),
            (Some(old), Some(new)) => {
                if old == new {
                    continue;
                }
                if T::replace_on_change() {
                    deletes.push(deleted(*old)?);
                    upserts.push(added(*new)?);
                    continue;
                }
                let fields = changed_fields(&scalar_fields(*old)?, &scalar_fields(*new)?);
                let children = T::children_diff(old, new)?;
                if fields.is_empty() && children.is_empty() {
                    continue;
                }
                upserts.push(
                    Delta::change(T::FAMILY, new.identity(), fields)
                        .with_children(children)
                        .with_flags(new.flags()),
                );
            }
            (None, None) => {}
        }
    }

    deletes.extend(upserts);
    Ok(deletes)
}

/// Build a record from an `Add` delta: scalar fields plus nested `Add` children.
///
/// # Errors
///
/// `InvalidDelta` if the payload does not describe a `T` with the delta's identity.
pub fn record_from_delta<T: Reconcilable>(delta: &Delta) -> Result<T> {
    let payload: serde_json::Map<String, Value> = delta
        .fields
        .iter()
        .filter(|(k, _)| !T::CHILD_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut record: T =
        serde_json::from_value(Value::Object(payload)).map_err(|e| JobDeltaError::InvalidDelta {
            family: T::FAMILY,
            reason: format!("Add payload for {} is incomplete: {}", delta.identity, e),
        })?;
    if record.identity() != delta.identity {
        return Err(JobDeltaError::InvalidDelta {
            family: T::FAMILY,
            reason: format!(
                "payload identity {} does not match delta identity {}",
                record.identity(),
                delta.identity
            ),
        });
    }
    record.apply_children(&delta.children)?;
    Ok(record)
}

/// Overlay changed scalar fields onto a copy of `item`.
fn overlay<T: Reconcilable>(item: &T, delta: &Delta) -> Result<T> {
    if let Some(child) = delta
        .fields
        .keys()
        .find(|k| T::CHILD_KEYS.contains(&k.as_str()))
    {
        return Err(JobDeltaError::InvalidDelta {
            family: T::FAMILY,
            reason: format!("'{}' must travel as child deltas, not a field", child),
        });
    }
    let mut value = serde_json::to_value(item)?;
    if let Value::Object(map) = &mut value {
        for (k, v) in &delta.fields {
            map.insert(k.clone(), v.clone());
        }
    }
    let updated: T = serde_json::from_value(value).map_err(|e| JobDeltaError::InvalidDelta {
        family: T::FAMILY,
        reason: format!("Change for {} does not fit the record: {}", delta.identity, e),
    })?;
    if updated.key() != item.key() {
        return Err(JobDeltaError::InvalidDelta {
            family: T::FAMILY,
            reason: format!("Change for {} rewrites the identity", delta.identity),
        });
    }
    Ok(updated)
}

/// Replay deltas of one family onto `items`, in order.
///
/// Delete of an unknown identity is a no-op; Add upserts; Change overlays
/// scalar fields on the matching record then replays its children. The list
/// is left holding only present items in key order.
///
/// # Errors
///
/// - `InvalidDelta` for a foreign family, a malformed identity or payload
/// - `DeltaTargetMissing` for a Change with no matching record
pub fn apply_family<T: Reconcilable>(items: &mut Vec<T>, deltas: &[Delta]) -> Result<()> {
    for delta in deltas {
        if delta.family != T::FAMILY {
            return Err(JobDeltaError::InvalidDelta {
                family: delta.family,
                reason: format!("found among {} deltas", T::FAMILY),
            });
        }
        let key = T::key_of(&delta.identity).ok_or_else(|| JobDeltaError::InvalidDelta {
            family: T::FAMILY,
            reason: format!("identity {} has the wrong shape", delta.identity),
        })?;
        let position = items.iter().position(|i| i.key() == key);

        match delta.action {
            Action::Delete => match position {
                Some(i) => {
                    items.remove(i);
                }
                None => tracing::warn!(
                    family = T::FAMILY.as_str(),
                    identity = %delta.identity,
                    "delete target not in baseline; skipping"
                ),
            },
            Action::Add => {
                let record = record_from_delta::<T>(delta)?;
                match position {
                    Some(i) => items[i] = record,
                    None => items.push(record),
                }
            }
            Action::Change => {
                let i = position.ok_or_else(|| JobDeltaError::DeltaTargetMissing {
                    family: T::FAMILY,
                    identity: delta.identity.to_string(),
                })?;
                let mut updated = overlay(&items[i], delta)?;
                updated.apply_children(&delta.children)?;
                items[i] = updated;
            }
        }
    }

    items.retain(T::is_present);
    items.sort_by(|a, b| a.key().cmp(&b.key()));
    Ok(())
}
