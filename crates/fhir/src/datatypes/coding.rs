use crate::fields::{Code, Id, Uri};
use crate::validation::{field_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};

/// A reference to a code defined by a terminology system.
///
/// See <http://build.fhir.org/datatypes-definitions.html#Coding>.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    /// The code system that defines the meaning of the symbol in `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Uri>,

    /// Version of the code system used when choosing this code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<BoundedText<35>>,

    /// A symbol in syntax defined by the system: a predefined code or an expression
    /// (e.g. post-coordination).
    pub code: Code,

    /// Meaning of the code in the system, following the rules of the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<BoundedText<255>>,

    /// Chosen directly by a user, e.g. off a pick list.
    #[serde(default)]
    pub user_selected: bool,
}

impl Coding {
    pub fn new(system: Option<Uri>, code: Code) -> Self {
        Self {
            id: None,
            extension: Vec::new(),
            system,
            version: None,
            code,
            display: None,
            user_selected: false,
        }
    }

    pub fn with_display(mut self, display: BoundedText<255>) -> Self {
        self.display = Some(display);
        self
    }

    /// Same system and code; display text and selection flag are ignored.
    pub fn same_concept(&self, other: &Coding) -> bool {
        self.system == other.system && self.code == other.code
    }
}

impl Validate for Coding {
    fn validate_at(&self, _path: &str, _errors: &mut ValidationErrors) {}
}

/// A concept that may be defined by one or more codings and/or plain text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            ..Self::default()
        }
    }

    pub fn has_coding(&self, system: Option<&Uri>, code: &Code) -> bool {
        self.coding
            .iter()
            .any(|c| c.system.as_ref() == system && &c.code == code)
    }
}

impl Validate for CodeableConcept {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        if self.coding.is_empty() && self.text.as_deref().map_or(true, str::is_empty) {
            errors.push(path, "a concept needs at least one coding or a text");
        }
        self.coding.validate_at(&field_path(path, "coding"), errors);
    }
}
