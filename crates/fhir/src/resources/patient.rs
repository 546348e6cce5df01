//! Patient: demographics and administrative information about a person receiving care.
//!
//! Responsibilities:
//! - Strict wire model (unknown keys are rejected)
//! - Identifier uniqueness within an assigning system
//! - Retirement by marking the record inactive rather than deleting it

use crate::codes::{AdministrativeGender, ResourceType};
use crate::datatypes::identifier::validate_unique_identifiers;
use crate::datatypes::{Address, ContactDetail, ContactPoint, HumanName, Identifier, Reference};
use crate::fields::{Code, Id, Uri};
use crate::narrative::Narrative;
use crate::resources::{domain_resource, validate_domain_parts, Meta, Retire};
use crate::validation::{field_path, Validate, ValidationErrors};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Patient {
    pub resource_type: ResourceType,

    #[serde(default)]
    pub id: Id,

    #[serde(default)]
    pub meta: Meta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_rules: Option<Uri>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Code>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Narrative>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    /// Business identifiers, e.g. a national health number.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    /// Whether this patient's record is in active use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<AdministrativeGender>,

    /// Date of birth (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deceased_boolean: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    /// Contact parties (guardian, partner, friend) for the patient.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<ContactDetail>,

    /// Organization that is the custodian of the patient record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managing_organization: Option<Reference>,
}

impl Patient {
    pub fn new() -> Self {
        Self {
            resource_type: ResourceType::Patient,
            id: Id::generate(),
            meta: Meta::default(),
            implicit_rules: None,
            language: None,
            text: None,
            contained: Vec::new(),
            extension: Vec::new(),
            identifier: Vec::new(),
            active: None,
            name: Vec::new(),
            telecom: Vec::new(),
            gender: None,
            birth_date: None,
            deceased_boolean: None,
            address: Vec::new(),
            contact: Vec::new(),
            managing_organization: None,
        }
    }

    /// The first name marked official, otherwise the first name given.
    pub fn primary_name(&self) -> Option<&HumanName> {
        self.name
            .iter()
            .find(|n| n.use_ == Some(crate::codes::NameUse::Official))
            .or_else(|| self.name.first())
    }
}

impl Default for Patient {
    fn default() -> Self {
        Self::new()
    }
}

domain_resource!(Patient, ResourceType::Patient);

impl Retire for Patient {
    fn retire(&mut self) {
        self.active = Some(false);
    }

    fn is_retired(&self) -> bool {
        self.active == Some(false)
    }
}

impl Validate for Patient {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        validate_domain_parts(&self.contained, path, errors);
        let identifier_path = field_path(path, "identifier");
        self.identifier.validate_at(&identifier_path, errors);
        validate_unique_identifiers(&self.identifier, &identifier_path, errors);
        self.name.validate_at(&field_path(path, "name"), errors);
        self.telecom.validate_at(&field_path(path, "telecom"), errors);
        self.address.validate_at(&field_path(path, "address"), errors);
        self.contact.validate_at(&field_path(path, "contact"), errors);
        self.managing_organization
            .validate_at(&field_path(path, "managingOrganization"), errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::NameUse;
    use crate::{wire, FhirError};

    const SAMPLE: &str = r#"resourceType: Patient
id: 90a8d1ea-3180-41d9-adb0-70a834d4e0f6

identifier:
  - system: https://fhir.nhs.uk/Id/nhs-number
    value: "9000000009"

name:
  - use: official
    family: Williams
    given:
      - Sarah
      - Jane
  - use: nickname
    given:
      - Sally

gender: female
birthDate: 1992-03-20

meta:
  lastUpdated: 2026-01-23T13:58:04.099304Z
"#;

    #[test]
    fn round_trips_sample_yaml() {
        let patient: Patient = wire::parse_resource_yaml(SAMPLE).expect("parse yaml");
        let output = wire::render_yaml(&patient).expect("render patient");
        let reparsed: Patient = wire::parse_resource_yaml(&output).expect("reparse yaml");
        assert_eq!(patient, reparsed);
    }

    #[test]
    fn parses_sample_fields() {
        let patient: Patient = wire::parse_resource_yaml(SAMPLE).expect("parse yaml");
        assert_eq!(patient.id.as_str(), "90a8d1ea-3180-41d9-adb0-70a834d4e0f6");
        assert_eq!(patient.gender, Some(AdministrativeGender::Female));
        assert_eq!(
            patient.birth_date,
            Some(NaiveDate::from_ymd_opt(1992, 3, 20).unwrap())
        );
        let name = patient.primary_name().expect("official name");
        assert_eq!(name.use_, Some(NameUse::Official));
        assert_eq!(name.display(), "Sarah Jane Williams");
        assert!(patient.meta.last_updated.is_some());
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = format!("{SAMPLE}unexpected_key: should_fail\n");
        let err = wire::parse_resource_yaml::<Patient>(&input).expect_err("should reject unknown key");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("unexpected_key")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_wrong_types() {
        let input = r#"resourceType: Patient
id: p1
name:
  - use: official
    family: Williams
    given: "not_an_array"
"#;
        let err = wire::parse_resource_yaml::<Patient>(input).expect_err("should reject wrong type");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("given"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_mismatching_resource_type() {
        let input = SAMPLE.replace("resourceType: Patient", "resourceType: Organization");
        let err = wire::parse_resource_yaml::<Patient>(&input)
            .expect_err("should reject another resourceType");
        match err {
            FhirError::InvalidInput(msg) => {
                assert!(msg.contains("Patient"));
                assert!(msg.contains("Organization"));
            }
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn minimal_patient_gets_an_id() {
        let patient: Patient = wire::parse_resource_yaml("resourceType: Patient\n").unwrap();
        assert!(!patient.id.as_str().is_empty());
        assert!(patient.name.is_empty());
        assert!(patient.birth_date.is_none());
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let input = SAMPLE.replace(
            "    value: \"9000000009\"\n",
            "    value: \"9000000009\"\n  - system: https://fhir.nhs.uk/Id/nhs-number\n    value: \"9000000009\"\n",
        );
        let err = wire::parse_resource_yaml::<Patient>(&input).expect_err("duplicate");
        match err {
            FhirError::Validation(errors) => assert!(errors.has_field("identifier[1].value")),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn retire_marks_inactive() {
        let mut patient = Patient::new();
        assert!(!patient.is_retired());
        patient.retire();
        assert_eq!(patient.active, Some(false));
    }
}
