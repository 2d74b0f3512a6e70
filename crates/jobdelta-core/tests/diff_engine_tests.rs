#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{attribute, choice, choice_with_options, elevation, job, location, option, summary};
use jobdelta_core::diff::{Action, Family, Identity};
use jobdelta_core::{diff_job, JobDeltaError};
use serde_json::json;

// ---------------------------------------------------------------------------
// Whole-job classification
// ---------------------------------------------------------------------------

#[test]
fn test_identical_jobs_produce_no_deltas() {
    let state = job(vec![choice_with_options(100, &[1, 2]), elevation(200)]);
    assert!(diff_job(&state, &state.clone()).unwrap().is_empty());
}

#[test]
fn test_deletes_come_first_then_upserts_in_key_order() {
    let committed = job(vec![choice(1), choice(3), choice(5)]);
    let mut changed = choice(3);
    changed.quantity = 2;
    let desired = job(vec![choice(2), changed, choice(4)]);

    let deltas = diff_job(&committed, &desired).unwrap();

    assert_eq!(
        summary(&deltas),
        vec![
            (Family::Choice, Action::Delete, Identity::Id(1)),
            (Family::Choice, Action::Delete, Identity::Id(5)),
            (Family::Choice, Action::Add, Identity::Id(2)),
            (Family::Choice, Action::Change, Identity::Id(3)),
            (Family::Choice, Action::Add, Identity::Id(4)),
        ]
    );
}

#[test]
fn test_change_carries_only_differing_fields() {
    let committed = job(vec![choice(100)]);
    let mut edited = choice(100);
    edited.quantity = 3;
    edited.override_note = Some("extra outlets".to_string());
    let desired = job(vec![edited]);

    let deltas = diff_job(&committed, &desired).unwrap();

    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].action, Action::Change);
    assert_eq!(deltas[0].fields.len(), 2);
    assert_eq!(deltas[0].fields["quantity"], json!(3));
    assert_eq!(deltas[0].fields["overrideNote"], json!("extra outlets"));
}

#[test]
fn test_zero_quantity_is_treated_as_absent() {
    let committed = job(vec![choice(100)]);
    let mut unselected = choice(100);
    unselected.quantity = 0;
    let desired = job(vec![unselected]);

    let deltas = diff_job(&committed, &desired).unwrap();
    assert_eq!(
        summary(&deltas),
        vec![(Family::Choice, Action::Delete, Identity::Id(100))]
    );

    // And the reverse: a zero-quantity committed row is nothing to delete.
    let back = diff_job(&job(vec![]), &job(vec![{
        let mut c = choice(7);
        c.quantity = 0;
        c
    }]))
    .unwrap();
    assert!(back.is_empty());
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[test]
fn test_add_carries_full_payload_and_child_adds() {
    let mut added = choice_with_options(200, &[11, 12]);
    added.attributes = vec![attribute(5, 1, "Walnut")];
    let deltas = diff_job(&job(vec![]), &job(vec![added])).unwrap();

    assert_eq!(deltas.len(), 1);
    let delta = &deltas[0];
    assert_eq!(delta.action, Action::Add);
    assert_eq!(delta.fields["catalogId"], json!(200));
    assert_eq!(delta.fields["label"], json!("Choice 200"));
    assert_eq!(delta.fields["listPrice"], json!(250.0));
    assert!(!delta.fields.contains_key("options"));

    assert_eq!(
        summary(&delta.children.options),
        vec![
            (Family::Option, Action::Add, Identity::Id(11)),
            (Family::Option, Action::Add, Identity::Id(12)),
        ]
    );
    assert_eq!(delta.children.attributes[0].identity, Identity::Pair(5, 1));
    assert_eq!(delta.children.total(), 3);
}

#[test]
fn test_delete_carries_last_known_payload_and_cascades() {
    let mut removed = choice_with_options(300, &[21]);
    removed.locations = vec![location(1, 1, 2, vec![attribute(7, 1, "Brushed nickel")])];
    let deltas = diff_job(&job(vec![removed]), &job(vec![])).unwrap();

    let delta = &deltas[0];
    assert_eq!(delta.action, Action::Delete);
    assert_eq!(delta.fields["label"], json!("Choice 300"));
    assert_eq!(delta.fields["quantity"], json!(1));

    assert_eq!(delta.children.options[0].action, Action::Delete);
    let location = &delta.children.locations[0];
    assert_eq!(location.action, Action::Delete);
    assert_eq!(location.identity, Identity::Pair(1, 1));
    assert_eq!(location.children.attributes[0].action, Action::Delete);
    assert_eq!(location.children.attributes[0].fields["name"], json!("Brushed nickel"));
}

// ---------------------------------------------------------------------------
// Nested differences
// ---------------------------------------------------------------------------

#[test]
fn test_option_mapping_change_is_choice_change_with_nested_option_deltas() {
    let committed = job(vec![choice_with_options(100, &[1])]);
    let desired = job(vec![choice_with_options(100, &[2])]);

    let deltas = diff_job(&committed, &desired).unwrap();

    assert_eq!(deltas.len(), 1);
    let delta = &deltas[0];
    assert_eq!(delta.family, Family::Choice);
    assert_eq!(delta.action, Action::Change);
    assert_eq!(delta.identity, Identity::Id(100));
    assert!(delta.fields.is_empty());
    assert_eq!(
        summary(&delta.children.options),
        vec![
            (Family::Option, Action::Delete, Identity::Id(1)),
            (Family::Option, Action::Add, Identity::Id(2)),
        ]
    );
}

#[test]
fn test_attribute_edit_is_replaced_not_changed() {
    let mut before = choice(100);
    before.attributes = vec![attribute(5, 1, "Oak")];
    let mut after = choice(100);
    after.attributes = vec![attribute(5, 1, "Oak - natural")];

    let deltas = diff_job(&job(vec![before]), &job(vec![after])).unwrap();

    assert_eq!(
        summary(&deltas[0].children.attributes),
        vec![
            (Family::Attribute, Action::Delete, Identity::Pair(5, 1)),
            (Family::Attribute, Action::Add, Identity::Pair(5, 1)),
        ]
    );
    assert_eq!(deltas[0].children.attributes[1].fields["name"], json!("Oak - natural"));
}

#[test]
fn test_location_removal_cascades_to_its_attributes() {
    let mut before = choice(100);
    before.locations = vec![
        location(1, 1, 2, vec![attribute(7, 1, "Chrome")]),
        location(1, 2, 1, vec![]),
    ];
    let mut after = choice(100);
    after.locations = vec![location(1, 2, 1, vec![])];

    let deltas = diff_job(&job(vec![before]), &job(vec![after])).unwrap();

    let locations = &deltas[0].children.locations;
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].action, Action::Delete);
    assert_eq!(
        summary(&locations[0].children.attributes),
        vec![(Family::Attribute, Action::Delete, Identity::Pair(7, 1))]
    );
}

#[test]
fn test_top_level_options_are_their_own_family() {
    let committed = jobdelta_core::JobState {
        options: vec![option(1)],
        ..Default::default()
    };
    let desired = jobdelta_core::JobState {
        options: vec![option(2)],
        ..Default::default()
    };

    let deltas = diff_job(&committed, &desired).unwrap();
    assert_eq!(
        summary(&deltas),
        vec![
            (Family::Option, Action::Delete, Identity::Id(1)),
            (Family::Option, Action::Add, Identity::Id(2)),
        ]
    );
}

// ---------------------------------------------------------------------------
// Flags and wire form
// ---------------------------------------------------------------------------

#[test]
fn test_elevation_flag_travels_on_choice_deltas() {
    let deltas = diff_job(&job(vec![]), &job(vec![elevation(400)])).unwrap();
    assert!(deltas[0].flags.is_elevation);
    assert!(!deltas[0].flags.is_color_scheme);

    let json = serde_json::to_value(&deltas[0]).unwrap();
    assert_eq!(json["flags"]["isElevation"], json!(true));
    assert_eq!(json["family"], json!("choice"));
    assert_eq!(json["identity"], json!(400));
}

#[test]
fn test_serialized_output_is_byte_stable() {
    let committed = job(vec![choice_with_options(100, &[1, 2]), choice(300)]);
    let desired = job(vec![choice_with_options(100, &[2, 3]), elevation(200)]);

    let first = serde_json::to_string(&diff_job(&committed, &desired).unwrap()).unwrap();
    let second = serde_json::to_string(&diff_job(&committed, &desired).unwrap()).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_duplicate_identity_is_fatal() {
    let desired = job(vec![choice(100), choice(100)]);
    let err = diff_job(&job(vec![]), &desired).unwrap_err();

    assert_eq!(
        err,
        JobDeltaError::InconsistentIdentity {
            family: Family::Choice,
            identity: "100".to_string(),
            side: "desired",
        }
    );
}

#[test]
fn test_duplicate_nested_identity_is_fatal() {
    let mut broken = choice(100);
    broken.options = vec![option(1), option(1)];
    let err = diff_job(&job(vec![choice(100)]), &job(vec![broken])).unwrap_err();

    assert!(matches!(
        err,
        JobDeltaError::InconsistentIdentity {
            family: Family::Option,
            ..
        }
    ));
}
