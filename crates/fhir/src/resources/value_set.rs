//! ValueSet: a named, versioned enumeration of codes usable within a coded field.
//!
//! Only enumerated composition is modelled: `compose.include` / `compose.exclude` list
//! concepts from code systems. Filters and value set imports are not supported.

use crate::codes::{PublicationStatus, ResourceType};
use crate::datatypes::identifier::validate_unique_identifiers;
use crate::datatypes::{Coding, ContactDetail, Identifier, Reference};
use crate::fields::{Code, Id, Instant, Markdown, Uri};
use crate::narrative::Narrative;
use crate::resources::{domain_resource, validate_domain_parts, Meta, Retire};
use crate::validation::{field_path, index_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValueSet {
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

    /// Canonical identifier for this value set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Uri>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    /// Business version of the value set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<BoundedText<35>>,

    /// Computer-friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<BoundedText<255>>,

    /// Human-friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<BoundedText<255>>,

    pub status: PublicationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<bool>,

    /// Date last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Instant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<BoundedText<255>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<ContactDetail>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Markdown>,

    /// Contexts the content is intended to support.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_context: Vec<Coding>,

    /// Whether the content logical definition may change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<Markdown>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose: Option<ValueSetCompose>,
}

/// Content logical definition of the value set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValueSetCompose {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<ConceptSet>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<ConceptSet>,
}

/// Concepts drawn from one code system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConceptSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Uri>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<BoundedText<35>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<ConceptReference>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConceptReference {
    pub code: Code,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<BoundedText<255>>,
}

impl ConceptSet {
    fn lists(&self, system: Option<&Uri>, code: &Code) -> bool {
        self.system.as_ref() == system && self.concept.iter().any(|c| &c.code == code)
    }
}

impl ValueSet {
    pub fn new(status: PublicationStatus) -> Self {
        Self {
            resource_type: ResourceType::ValueSet,
            id: Id::generate(),
            meta: Meta::default(),
            implicit_rules: None,
            language: None,
            text: None,
            contained: Vec::new(),
            extension: Vec::new(),
            url: None,
            identifier: Vec::new(),
            version: None,
            name: None,
            title: None,
            status,
            experimental: None,
            date: None,
            publisher: None,
            contact: Vec::new(),
            description: None,
            use_context: Vec::new(),
            immutable: None,
            purpose: None,
            compose: None,
        }
    }

    /// `url|version`, unique across stored value sets. `None` without a url.
    pub fn canonical_key(&self) -> Option<String> {
        self.url.as_ref().map(|url| {
            format!(
                "{url}|{}",
                self.version.as_ref().map(BoundedText::as_str).unwrap_or("")
            )
        })
    }

    /// True if the code is included by some concept set and excluded by none.
    pub fn contains(&self, system: Option<&Uri>, code: &Code) -> bool {
        let Some(compose) = &self.compose else {
            return false;
        };
        compose.include.iter().any(|set| set.lists(system, code))
            && !compose.exclude.iter().any(|set| set.lists(system, code))
    }

    pub fn contains_coding(&self, coding: &Coding) -> bool {
        self.contains(coding.system.as_ref(), &coding.code)
    }

    /// Every included, non-excluded concept as a coding, in declaration order.
    pub fn expand(&self) -> Vec<Coding> {
        let Some(compose) = &self.compose else {
            return Vec::new();
        };
        let mut expansion: Vec<Coding> = Vec::new();
        for set in &compose.include {
            for concept in &set.concept {
                if compose
                    .exclude
                    .iter()
                    .any(|ex| ex.lists(set.system.as_ref(), &concept.code))
                {
                    continue;
                }
                let mut coding = Coding::new(set.system.clone(), concept.code.clone());
                coding.version = set.version.clone();
                coding.display = concept.display.clone();
                if !expansion.iter().any(|c| c.same_concept(&coding)) {
                    expansion.push(coding);
                }
            }
        }
        expansion
    }
}

domain_resource!(ValueSet, ResourceType::ValueSet);

impl Retire for ValueSet {
    fn retire(&mut self) {
        self.status = PublicationStatus::Retired;
    }

    fn is_retired(&self) -> bool {
        self.status == PublicationStatus::Retired
    }
}

impl Validate for ValueSet {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        validate_domain_parts(&self.contained, path, errors);
        let identifier_path = field_path(path, "identifier");
        self.identifier.validate_at(&identifier_path, errors);
        validate_unique_identifiers(&self.identifier, &identifier_path, errors);
        self.contact.validate_at(&field_path(path, "contact"), errors);

        if let Some(compose) = &self.compose {
            let compose_path = field_path(path, "compose");
            for (label, sets) in [("include", &compose.include), ("exclude", &compose.exclude)] {
                for (i, set) in sets.iter().enumerate() {
                    if set.system.is_none() {
                        errors.push(
                            field_path(&index_path(&field_path(&compose_path, label), i), "system"),
                            "a concept set needs a code system",
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire;

    const GENDER_SUBSET: &str = r#"resourceType: ValueSet
id: gender-subset
url: http://example.org/fhir/ValueSet/gender-subset
version: "1.0.0"
name: GenderSubset
status: active
compose:
  include:
    - system: http://hl7.org/fhir/administrative-gender
      concept:
        - code: male
          display: Male
        - code: female
          display: Female
        - code: other
  exclude:
    - system: http://hl7.org/fhir/administrative-gender
      concept:
        - code: other
"#;

    fn gender_system() -> Uri {
        Uri::new("http://hl7.org/fhir/administrative-gender").unwrap()
    }

    #[test]
    fn parses_and_expands() {
        let vs: ValueSet = wire::parse_resource_yaml(GENDER_SUBSET).unwrap();
        let expansion = vs.expand();
        let codes: Vec<_> = expansion.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["male", "female"]);
        assert_eq!(
            vs.canonical_key().as_deref(),
            Some("http://example.org/fhir/ValueSet/gender-subset|1.0.0")
        );
    }

    #[test]
    fn contains_honours_excludes() {
        let vs: ValueSet = wire::parse_resource_yaml(GENDER_SUBSET).unwrap();
        let system = gender_system();
        assert!(vs.contains(Some(&system), &Code::new("male").unwrap()));
        assert!(!vs.contains(Some(&system), &Code::new("other").unwrap()));
        assert!(!vs.contains(None, &Code::new("male").unwrap()));
    }

    #[test]
    fn status_outside_the_enumeration_is_rejected() {
        let input = GENDER_SUBSET.replace("status: active", "status: published");
        let err = wire::parse_resource_yaml::<ValueSet>(&input).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("status"), "{msg}");
        assert!(msg.contains("draft"), "{msg}");
    }

    #[test]
    fn every_allowed_status_parses() {
        for status in PublicationStatus::CODES {
            let input = GENDER_SUBSET.replace("status: active", &format!("status: {status}"));
            let vs: ValueSet = wire::parse_resource_yaml(&input).unwrap();
            assert_eq!(vs.status.as_str(), *status);
        }
    }

    #[test]
    fn retire_sets_status() {
        let mut vs = ValueSet::new(PublicationStatus::Active);
        vs.retire();
        assert!(vs.is_retired());
    }

    #[test]
    fn concept_set_without_system_is_rejected() {
        let mut vs = ValueSet::new(PublicationStatus::Draft);
        vs.compose = Some(ValueSetCompose {
            include: vec![ConceptSet::default()],
            exclude: Vec::new(),
        });
        assert!(vs
            .validate()
            .unwrap_err()
            .has_field("compose.include[0].system"));
    }
}
