use crate::codes::{PublicationStatus, ResourceType, StructureDefinitionKind, TypeDerivationRule};
use crate::datatypes::identifier::validate_unique_identifiers;
use crate::datatypes::{Coding, ContactDetail, Identifier, Reference};
use crate::fields::{Code, Id, Instant, Markdown, Uri};
use crate::narrative::Narrative;
use crate::resources::{domain_resource, validate_domain_parts, Meta, Retire};
use crate::validation::{field_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};

/// Definition of a structure: a datatype, a resource, or a profile on either.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StructureDefinition {
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

    /// Canonical identifier for this structure definition.
    pub url: Uri,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<BoundedText<35>>,

    /// Computer-friendly name.
    pub name: BoundedText<255>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<BoundedText<255>>,

    pub status: PublicationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Instant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<BoundedText<255>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<ContactDetail>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Markdown>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_context: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<Markdown>,

    pub kind: StructureDefinitionKind,

    /// Whether the structure is abstract.
    #[serde(rename = "abstract")]
    pub is_abstract: bool,

    /// Type defined or constrained by this structure.
    #[serde(rename = "type")]
    pub type_: Uri,

    /// Definition that this type is constrained/specialised from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<Uri>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivationRule>,
}

impl StructureDefinition {
    /// `url|version`, unique across stored structure definitions.
    pub fn canonical_key(&self) -> String {
        format!(
            "{}|{}",
            self.url,
            self.version.as_ref().map(BoundedText::as_str).unwrap_or("")
        )
    }

    /// A profile constrains another definition rather than specialising it.
    pub fn is_profile(&self) -> bool {
        self.derivation == Some(TypeDerivationRule::Constraint)
    }
}

domain_resource!(StructureDefinition, ResourceType::StructureDefinition);

impl Retire for StructureDefinition {
    fn retire(&mut self) {
        self.status = PublicationStatus::Retired;
    }

    fn is_retired(&self) -> bool {
        self.status == PublicationStatus::Retired
    }
}

impl Validate for StructureDefinition {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        validate_domain_parts(&self.contained, path, errors);
        let identifier_path = field_path(path, "identifier");
        self.identifier.validate_at(&identifier_path, errors);
        validate_unique_identifiers(&self.identifier, &identifier_path, errors);
        self.contact.validate_at(&field_path(path, "contact"), errors);

        if self.name.is_empty() {
            errors.push(field_path(path, "name"), "name is required");
        }
        if self.derivation.is_some() && self.base_definition.is_none() {
            errors.push(
                field_path(path, "baseDefinition"),
                "a derived structure needs a baseDefinition",
            );
        }
        if self.base_definition.as_ref() == Some(&self.url) {
            errors.push(
                field_path(path, "baseDefinition"),
                "a structure cannot be derived from itself",
            );
        }
    }
}
