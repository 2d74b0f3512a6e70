use serde::{Deserialize, Serialize};

/// Kind of decision point that owns a choice
///
/// Elevation and color-scheme decision points are surfaced on choice deltas
/// as `isElevation` / `isColorScheme` flags; downstream pricing and document
/// generation treat those choices specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionPointType {
    #[default]
    Standard,
    Elevation,
    ColorScheme,
}

/// A selectable line item at a decision point in the configuration tree
///
/// Identity is the catalog id (`catalogId`), which is stable across catalog
/// versions. A quantity of 0 means "not selected" and is treated exactly like
/// absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Catalog identity (stable across catalog versions)
    pub catalog_id: i64,

    #[serde(default)]
    pub label: String,

    /// Owning decision point
    #[serde(default)]
    pub decision_point_id: i64,

    #[serde(default)]
    pub decision_point_type: DecisionPointType,

    /// 0 = not selected
    pub quantity: u32,

    /// Carried through unchanged; the engine never prices anything
    #[serde(default)]
    pub list_price: f64,

    /// Free-text override note entered by sales staff
    #[serde(default)]
    pub override_note: Option<String>,

    /// Options backing this choice
    #[serde(default)]
    pub options: Vec<JobOption>,

    /// Attributes selected directly on the choice (not tied to a location)
    #[serde(default)]
    pub attributes: Vec<Attribute>,

    /// Placement instances, each with its own attributes
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl Choice {
    /// Create a selected choice with no nested selections
    pub fn new(catalog_id: i64, quantity: u32) -> Self {
        Self {
            catalog_id,
            label: String::new(),
            decision_point_id: 0,
            decision_point_type: DecisionPointType::Standard,
            quantity,
            list_price: 0.0,
            override_note: None,
            options: Vec::new(),
            attributes: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn key(&self) -> i64 {
        self.catalog_id
    }

    pub fn is_elevation(&self) -> bool {
        self.decision_point_type == DecisionPointType::Elevation
    }

    pub fn is_color_scheme(&self) -> bool {
        self.decision_point_type == DecisionPointType::ColorScheme
    }

    /// Drop unselected nested items and order everything by identity.
    pub fn canonical(mut self) -> Self {
        self.options = canonical_options(self.options);
        self.attributes = canonical_attributes(self.attributes);
        self.locations = self
            .locations
            .into_iter()
            .filter(|l| l.quantity > 0)
            .map(Location::canonical)
            .collect();
        self.locations.sort_by_key(Location::key);
        self
    }
}

/// A construction-catalog item backing one or more choices
///
/// `catalog_id` may be re-keyed when the catalog is republished; the
/// `integration_key` is the external identifier that survives that churn
/// and is what historic mappings are keyed by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOption {
    pub catalog_id: i64,

    #[serde(default)]
    pub integration_key: String,

    pub quantity: u32,

    #[serde(default)]
    pub list_price: f64,

    /// Set on the job's base-house option
    #[serde(default)]
    pub is_base_house: bool,

    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl JobOption {
    pub fn new(catalog_id: i64, integration_key: impl Into<String>) -> Self {
        Self {
            catalog_id,
            integration_key: integration_key.into(),
            quantity: 1,
            list_price: 0.0,
            is_base_house: false,
            attributes: Vec::new(),
        }
    }

    pub fn key(&self) -> i64 {
        self.catalog_id
    }

    pub fn canonical(mut self) -> Self {
        self.attributes = canonical_attributes(self.attributes);
        self
    }
}

/// A descriptive selection such as a color or finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub attribute_group_id: i64,
    pub attribute_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

impl Attribute {
    pub fn new(attribute_group_id: i64, attribute_id: i64, name: impl Into<String>) -> Self {
        Self {
            attribute_group_id,
            attribute_id,
            name: name.into(),
            sku: None,
            manufacturer: None,
        }
    }

    pub fn key(&self) -> (i64, i64) {
        (self.attribute_group_id, self.attribute_id)
    }
}

/// A placement instance of a choice (e.g. which room an outlet goes in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_group_id: i64,
    pub location_id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Location {
    pub fn new(location_group_id: i64, location_id: i64, quantity: u32) -> Self {
        Self {
            location_group_id,
            location_id,
            quantity,
            attributes: Vec::new(),
        }
    }

    pub fn key(&self) -> (i64, i64) {
        (self.location_group_id, self.location_id)
    }

    pub fn canonical(mut self) -> Self {
        self.attributes = canonical_attributes(self.attributes);
        self
    }
}

pub(crate) fn canonical_options(options: Vec<JobOption>) -> Vec<JobOption> {
    let mut options: Vec<JobOption> = options
        .into_iter()
        .filter(|o| o.quantity > 0)
        .map(JobOption::canonical)
        .collect();
    options.sort_by_key(JobOption::key);
    options
}

fn canonical_attributes(mut attributes: Vec<Attribute>) -> Vec<Attribute> {
    attributes.sort_by_key(Attribute::key);
    attributes
}
