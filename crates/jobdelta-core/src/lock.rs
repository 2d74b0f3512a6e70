//! Lock & historic-mapping resolver
//!
//! A choice or option is locked in when either:
//!
//! - it is selected in the committed state and no open change order deletes it, or
//! - it was added by a change order whose status is neither Pending nor Withdrawn.
//!
//! Options are locked both under their owning choice and at job level. An
//! option Delete nested in an open order's choice Change unlocks just that
//! option; the choice stays locked.
//!
//! Locked items must keep surfacing the options that back them, even after
//! the live catalog has re-keyed those options. Each option is resolved by
//! its integration key against a [`HistoricOptionMapping`] passed in by the
//! caller; an unmapped option gets a synthetic default rule instead.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::diff::engine::{record_from_delta, Reconcilable};
use crate::diff::model::{Action, Family, Identity};
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{ChangeOrder, Choice, CommittedState, JobOption};
use crate::{log_op_end, log_op_error, log_op_start};

/// Attribute group that an option rule moves onto another choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReassignment {
    pub attribute_group_id: i64,
    pub to_choice_id: i64,
}

/// One choice implied by an option rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleChoice {
    pub catalog_id: i64,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub attribute_reassignments: Vec<AttributeReassignment>,
}

/// Currently valid selection rule for an option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRule {
    pub integration_key: String,
    #[serde(default)]
    pub choices: Vec<RuleChoice>,
}

impl OptionRule {
    /// This option implies exactly `choice_id`, mandatory, with no
    /// attribute reassignment.
    pub fn default_for(integration_key: impl Into<String>, choice_id: i64) -> Self {
        Self {
            integration_key: integration_key.into(),
            choices: vec![RuleChoice {
                catalog_id: choice_id,
                mandatory: true,
                attribute_reassignments: Vec::new(),
            }],
        }
    }

    /// Default rule for a job-level option: it implies no choice.
    pub fn standalone(integration_key: impl Into<String>) -> Self {
        Self {
            integration_key: integration_key.into(),
            choices: Vec::new(),
        }
    }
}

/// Lookup from integration key to the option rule valid today
///
/// Serialized as a plain list of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<OptionRule>", into = "Vec<OptionRule>")]
pub struct HistoricOptionMapping {
    rules: BTreeMap<String, OptionRule>,
}

impl HistoricOptionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule: OptionRule) {
        self.rules.insert(rule.integration_key.clone(), rule);
    }

    pub fn get(&self, integration_key: &str) -> Option<&OptionRule> {
        self.rules.get(integration_key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<OptionRule>> for HistoricOptionMapping {
    fn from(rules: Vec<OptionRule>) -> Self {
        let mut mapping = Self::new();
        for rule in rules {
            mapping.insert(rule);
        }
        mapping
    }
}

impl From<HistoricOptionMapping> for Vec<OptionRule> {
    fn from(mapping: HistoricOptionMapping) -> Self {
        mapping.rules.into_values().collect()
    }
}

/// An option of a locked choice together with the rule that governs it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptionRule {
    pub option: JobOption,
    pub rule: OptionRule,
    /// True when no historic mapping existed and the default rule was used
    pub synthetic: bool,
}

/// Where a locked choice came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "source")]
pub enum LockOrigin {
    Committed,
    ChangeOrder {
        #[serde(rename = "changeOrderId")]
        change_order_id: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedChoice {
    pub choice: Choice,
    pub origin: LockOrigin,
    pub option_rules: Vec<ResolvedOptionRule>,
}

/// A job-level option that is locked in, with its rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedOption {
    #[serde(flatten)]
    pub resolved: ResolvedOptionRule,
    pub origin: LockOrigin,
}

/// Non-fatal data-quality finding surfaced alongside a successful result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Warning {
    /// Option has neither an integration key nor a catalog id to build a rule from
    MissingCatalogMapping {
        /// Owning choice; `None` for a job-level option
        #[serde(rename = "choiceId", default, skip_serializing_if = "Option::is_none")]
        choice_id: Option<i64>,
        #[serde(rename = "optionCatalogId")]
        option_catalog_id: i64,
    },
}

impl From<&Warning> for ExError {
    fn from(warning: &Warning) -> Self {
        match warning {
            Warning::MissingCatalogMapping {
                choice_id,
                option_catalog_id,
            } => ExError::new(ExErrorKind::MissingCatalogMapping)
                .with_op("resolve_locked_choices")
                .with_family(Family::Option.as_str())
                .with_entity_id(option_catalog_id.to_string())
                .with_message(match choice_id {
                    Some(choice_id) => format!(
                        "option under choice {} has no identity to map; omitted",
                        choice_id
                    ),
                    None => "job-level option has no identity to map; omitted".to_string(),
                }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResolution {
    pub locked: Vec<LockedChoice>,
    #[serde(default)]
    pub locked_options: Vec<LockedOption>,
    pub warnings: Vec<Warning>,
}

impl LockResolution {
    pub fn is_locked(&self, choice_id: i64) -> bool {
        self.locked.iter().any(|l| l.choice.catalog_id == choice_id)
    }

    pub fn is_option_locked(&self, option_id: i64) -> bool {
        self.locked_options
            .iter()
            .any(|l| l.resolved.option.catalog_id == option_id)
    }
}

/// Resolve locked choices and options, with the rules for the options.
///
/// `change_orders` is every change order of the job, in any status.
///
/// # Errors
///
/// `InvalidDelta` if an accepted change order carries a malformed choice or
/// option Add.
/// Missing mappings never fail; they are reported in
/// [`LockResolution::warnings`].
pub fn resolve_locked_choices(
    committed: &CommittedState,
    change_orders: &[ChangeOrder],
    mapping: &HistoricOptionMapping,
) -> Result<LockResolution> {
    log_op_start!("resolve_locked_choices", mapping_size = mapping.len());
    let start = std::time::Instant::now();

    let resolution = resolve_impl(committed, change_orders, mapping).map_err(|e| {
        log_op_error!(
            "resolve_locked_choices",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "resolve_locked_choices",
        duration_ms = start.elapsed().as_millis() as u64,
        locked_count = resolution.locked.len(),
        locked_option_count = resolution.locked_options.len(),
        warning_count = resolution.warnings.len()
    );
    Ok(resolution)
}

/// Deletes proposed by open change orders
#[derive(Debug, Default)]
struct PendingDeletes {
    choices: BTreeSet<i64>,
    /// Option Deletes nested in a choice Change, by owning choice
    choice_options: BTreeMap<i64, BTreeSet<i64>>,
    options: BTreeSet<i64>,
}

impl PendingDeletes {
    fn collect(change_orders: &[ChangeOrder]) -> Self {
        let mut pending = Self::default();
        for delta in change_orders
            .iter()
            .filter(|co| co.status.is_open())
            .flat_map(|co| co.deltas.iter())
        {
            match (delta.family, delta.action) {
                (Family::Choice, Action::Delete) => {
                    pending.choices.extend(Choice::key_of(&delta.identity));
                }
                (Family::Choice, Action::Change) => {
                    let Some(choice_id) = Choice::key_of(&delta.identity) else {
                        continue;
                    };
                    let deleted = delta
                        .children
                        .options
                        .iter()
                        .filter(|d| d.action == Action::Delete)
                        .filter_map(|d| JobOption::key_of(&d.identity));
                    pending
                        .choice_options
                        .entry(choice_id)
                        .or_default()
                        .extend(deleted);
                }
                (Family::Option, Action::Delete) => {
                    pending.options.extend(JobOption::key_of(&delta.identity));
                }
                _ => {}
            }
        }
        pending
    }

    /// Drop the options of `choice` that an open order deletes.
    fn retain_options(&self, choice: &mut Choice) {
        let choice_id = choice.catalog_id;
        let Some(deleted) = self.choice_options.get(&choice_id) else {
            return;
        };
        choice.options.retain(|option| {
            let keep = !deleted.contains(&option.catalog_id);
            if !keep {
                tracing::debug!(
                    choice_id,
                    option_id = option.catalog_id,
                    "option unlocked by pending delete"
                );
            }
            keep
        });
    }
}

fn resolve_impl(
    committed: &CommittedState,
    change_orders: &[ChangeOrder],
    mapping: &HistoricOptionMapping,
) -> Result<LockResolution> {
    let pending = PendingDeletes::collect(change_orders);
    let accepted: Vec<&ChangeOrder> = change_orders
        .iter()
        .filter(|co| co.status.locks_additions())
        .collect();

    let mut choices: BTreeMap<i64, (Choice, LockOrigin)> = BTreeMap::new();

    for choice in committed.choices.iter().filter(|c| c.is_present()) {
        if pending.choices.contains(&choice.catalog_id) {
            tracing::debug!(choice_id = choice.catalog_id, "unlocked by pending delete");
            continue;
        }
        let mut choice = choice.clone();
        pending.retain_options(&mut choice);
        choices.insert(choice.catalog_id, (choice, LockOrigin::Committed));
    }

    for co in &accepted {
        for delta in co.deltas_of(Family::Choice, Action::Add) {
            let choice: Choice = record_from_delta(delta)?;
            if !choice.is_present() {
                continue;
            }
            choices.entry(choice.catalog_id).or_insert((
                choice,
                LockOrigin::ChangeOrder {
                    change_order_id: co.id,
                },
            ));
        }
    }

    let mut options: BTreeMap<i64, (JobOption, LockOrigin)> = BTreeMap::new();

    for option in committed.options.iter().filter(|o| o.is_present()) {
        if pending.options.contains(&option.catalog_id) {
            tracing::debug!(option_id = option.catalog_id, "unlocked by pending delete");
            continue;
        }
        options.insert(option.catalog_id, (option.clone(), LockOrigin::Committed));
    }

    for co in &accepted {
        for delta in co.deltas_of(Family::Option, Action::Add) {
            let option: JobOption = record_from_delta(delta)?;
            if !option.is_present() {
                continue;
            }
            options.entry(option.catalog_id).or_insert((
                option,
                LockOrigin::ChangeOrder {
                    change_order_id: co.id,
                },
            ));
        }
    }

    let mut warnings = Vec::new();
    let locked = choices
        .into_values()
        .map(|(choice, origin)| {
            let option_rules = choice
                .options
                .iter()
                .filter(|option| option.is_present())
                .filter_map(|option| {
                    resolve_option(Some(choice.catalog_id), option, mapping, &mut warnings)
                })
                .collect();
            LockedChoice {
                choice,
                origin,
                option_rules,
            }
        })
        .collect();

    let locked_options = options
        .into_values()
        .filter_map(|(option, origin)| {
            resolve_option(None, &option, mapping, &mut warnings)
                .map(|resolved| LockedOption { resolved, origin })
        })
        .collect();

    Ok(LockResolution {
        locked,
        locked_options,
        warnings,
    })
}

/// Rule for one option; `owner` is the choice it sits under, if any.
fn resolve_option(
    owner: Option<i64>,
    option: &JobOption,
    mapping: &HistoricOptionMapping,
    warnings: &mut Vec<Warning>,
) -> Option<ResolvedOptionRule> {
    let key = option.integration_key.trim();

    if let Some(rule) = Some(key).filter(|k| !k.is_empty()).and_then(|k| mapping.get(k)) {
        return Some(ResolvedOptionRule {
            option: option.clone(),
            rule: rule.clone(),
            synthetic: false,
        });
    }

    if key.is_empty() && option.catalog_id <= 0 {
        let warning = Warning::MissingCatalogMapping {
            choice_id: owner,
            option_catalog_id: option.catalog_id,
        };
        let report = ExError::from(&warning);
        tracing::warn!(
            err_code = report.code(),
            choice_id = owner,
            "{}",
            report.message()
        );
        warnings.push(warning);
        return None;
    }

    let rule = match owner {
        Some(choice_id) => OptionRule::default_for(key, choice_id),
        None => OptionRule::standalone(key),
    };
    Some(ResolvedOptionRule {
        option: option.clone(),
        rule,
        synthetic: true,
    })
}
