use crate::codes::IdentifierUse;
use crate::datatypes::{CodeableConcept, Period, Reference};
use crate::fields::{Id, Uri};
use crate::validation::{field_path, index_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An identifier assigned by an external system, e.g. a medical record number.
///
/// Identifiers are unique within their assigning `system`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Identifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<IdentifierUse>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<CodeableConcept>,

    /// Namespace for the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Uri>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<BoundedText<255>>,

    /// Time period when the identifier is/was valid for use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    /// Organization that issued the identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigner: Option<Box<Reference>>,
}

impl Identifier {
    pub fn new(system: Uri, value: BoundedText<255>) -> Self {
        Self {
            system: Some(system),
            value: Some(value),
            ..Self::default()
        }
    }

    /// `system|value`, the key identifiers must be unique on. `None` when either half is
    /// missing.
    pub fn key(&self) -> Option<String> {
        match (&self.system, &self.value) {
            (Some(system), Some(value)) => Some(format!("{system}|{value}")),
            _ => None,
        }
    }
}

impl Validate for Identifier {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        self.type_.validate_at(&field_path(path, "type"), errors);
        self.period.validate_at(&field_path(path, "period"), errors);
        self.assigner.validate_at(&field_path(path, "assigner"), errors);
    }
}

/// Flag repeated `system|value` pairs inside one list of identifiers.
pub fn validate_unique_identifiers(
    identifiers: &[Identifier],
    path: &str,
    errors: &mut ValidationErrors,
) {
    let mut seen = HashSet::new();
    for (i, identifier) in identifiers.iter().enumerate() {
        if let Some(key) = identifier.key() {
            if !seen.insert(key.clone()) {
                errors.push(
                    field_path(&index_path(path, i), "value"),
                    format!("identifier {key} is listed more than once"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Instant;

    fn mrn(value: &str) -> Identifier {
        Identifier::new(
            Uri::new("urn:oid:1.2.36.146.595.217.0.1").unwrap(),
            BoundedText::new(value).unwrap(),
        )
    }

    #[test]
    fn key_joins_system_and_value() {
        assert_eq!(
            mrn("12345").key().as_deref(),
            Some("urn:oid:1.2.36.146.595.217.0.1|12345")
        );
        assert_eq!(Identifier::default().key(), None);
    }

    #[test]
    fn nested_period_is_validated() {
        let mut identifier = mrn("1");
        identifier.period = Some(Period::new(
            Some(Instant::parse("2020-01-02T00:00:00Z").unwrap()),
            Some(Instant::parse("2020-01-01T00:00:00Z").unwrap()),
        ));
        let errors = identifier.validate().unwrap_err();
        assert!(errors.has_field("period.end"));
    }

    #[test]
    fn duplicates_within_a_list_are_reported() {
        let mut errors = ValidationErrors::new();
        validate_unique_identifiers(&[mrn("1"), mrn("2"), mrn("1")], "identifier", &mut errors);
        assert!(errors.has_field("identifier[2].value"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn parses_wire_names() {
        let identifier: Identifier = serde_json::from_str(
            r#"{"use":"official","system":"http://ns.electronichealth.net.au/id/hi/ihi/1.0","value":"8003608166690503","assigner":{"display":"Medicare Australia"}}"#,
        )
        .unwrap();
        assert_eq!(identifier.use_, Some(IdentifierUse::Official));
        assert!(identifier.assigner.is_some());
    }
}
