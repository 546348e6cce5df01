use crate::codes::{ContactPointSystem, ContactPointUse};
use crate::datatypes::Period;
use crate::fields::Id;
use crate::validation::{field_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};

/// Details for a technology-mediated contact point (phone, fax, email, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<ContactPointSystem>,

    /// The actual contact point details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<BoundedText<255>>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<ContactPointUse>,

    /// Preferred order of use (1 = highest).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

impl ContactPoint {
    pub fn new(system: ContactPointSystem, value: BoundedText<255>) -> Self {
        Self {
            system: Some(system),
            value: Some(value),
            ..Self::default()
        }
    }
}

impl Validate for ContactPoint {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        if self.value.is_some() && self.system.is_none() {
            errors.push(
                field_path(path, "system"),
                "a system is required if a value is provided",
            );
        }
        if self.rank == Some(0) {
            errors.push(field_path(path, "rank"), "rank must be a positive integer");
        }
        self.period.validate_at(&field_path(path, "period"), errors);
    }
}

/// Contact information for a person or organisation, typically a publisher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<BoundedText<255>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
}

impl ContactDetail {
    /// Highest-ranked contact point of the given system; unranked entries come last.
    pub fn preferred(&self, system: ContactPointSystem) -> Option<&ContactPoint> {
        self.telecom
            .iter()
            .filter(|cp| cp.system == Some(system))
            .min_by_key(|cp| cp.rank.unwrap_or(u32::MAX))
    }
}

impl Validate for ContactDetail {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        self.telecom.validate_at(&field_path(path, "telecom"), errors);
    }
}
