use jobdelta_core::diff::{Action, Delta, Family, Identity};
use jobdelta_core::model::{
    Attribute, Buyer, Choice, DecisionPointType, JobOption, JobState, Location,
};

/// Choice with a label and price so payload assertions have something to check
#[allow(dead_code)]
pub fn choice(catalog_id: i64) -> Choice {
    let mut choice = Choice::new(catalog_id, 1);
    choice.label = format!("Choice {}", catalog_id);
    choice.decision_point_id = catalog_id / 100;
    choice.list_price = 250.0;
    choice
}

/// Choice backed by the given options, each with integration key `OPT-<id>`
#[allow(dead_code)]
pub fn choice_with_options(catalog_id: i64, option_ids: &[i64]) -> Choice {
    let mut choice = choice(catalog_id);
    choice.options = option_ids.iter().map(|id| option(*id)).collect();
    choice
}

#[allow(dead_code)]
pub fn elevation(catalog_id: i64) -> Choice {
    let mut choice = choice(catalog_id);
    choice.decision_point_type = DecisionPointType::Elevation;
    choice
}

#[allow(dead_code)]
pub fn option(catalog_id: i64) -> JobOption {
    let mut option = JobOption::new(catalog_id, format!("OPT-{}", catalog_id));
    option.list_price = 99.5;
    option
}

#[allow(dead_code)]
pub fn attribute(group: i64, id: i64, name: &str) -> Attribute {
    Attribute::new(group, id, name)
}

#[allow(dead_code)]
pub fn location(group: i64, id: i64, quantity: u32, attributes: Vec<Attribute>) -> Location {
    let mut location = Location::new(group, id, quantity);
    location.attributes = attributes;
    location
}

#[allow(dead_code)]
pub fn buyer(id: i64, is_primary: bool, sort_key: i32, first: &str, last: &str) -> Buyer {
    let mut buyer = Buyer::new(id, first, last);
    buyer.is_primary = is_primary;
    buyer.sort_key = sort_key;
    buyer
}

#[allow(dead_code)]
pub fn job(choices: Vec<Choice>) -> JobState {
    JobState {
        choices,
        ..JobState::default()
    }
}

/// (family, action, identity) triples, the shape most assertions care about
#[allow(dead_code)]
pub fn summary(deltas: &[Delta]) -> Vec<(Family, Action, Identity)> {
    deltas
        .iter()
        .map(|d| (d.family, d.action, d.identity.clone()))
        .collect()
}
