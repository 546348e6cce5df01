use crate::codes::ResourceType;
use crate::datatypes::identifier::validate_unique_identifiers;
use crate::datatypes::{Address, CodeableConcept, ContactDetail, ContactPoint, Identifier, Reference};
use crate::fields::{Code, Id, Uri};
use crate::narrative::Narrative;
use crate::resources::{domain_resource, validate_domain_parts, FhirResource, Meta, Retire};
use crate::validation::{field_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};

/// A formally or informally recognised grouping of people or organisations
/// (a hospital, a GP practice, a department). Wire name `Organization`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Organisation {
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

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Kind of organisation.
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<BoundedText<255>>,

    /// Other names the organisation is known by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alias: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    /// The organisation this one is part of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<ContactDetail>,
}

impl Organisation {
    pub fn named(name: BoundedText<255>) -> Self {
        Self {
            resource_type: ResourceType::Organization,
            id: Id::generate(),
            meta: Meta::default(),
            implicit_rules: None,
            language: None,
            text: None,
            contained: Vec::new(),
            extension: Vec::new(),
            identifier: Vec::new(),
            active: None,
            type_: Vec::new(),
            name: Some(name),
            alias: Vec::new(),
            telecom: Vec::new(),
            address: Vec::new(),
            part_of: None,
            contact: Vec::new(),
        }
    }
}

domain_resource!(Organisation, ResourceType::Organization);

impl Retire for Organisation {
    fn retire(&mut self) {
        self.active = Some(false);
    }

    fn is_retired(&self) -> bool {
        self.active == Some(false)
    }
}

impl Validate for Organisation {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        validate_domain_parts(&self.contained, path, errors);
        let identifier_path = field_path(path, "identifier");
        self.identifier.validate_at(&identifier_path, errors);
        validate_unique_identifiers(&self.identifier, &identifier_path, errors);
        self.type_.validate_at(&field_path(path, "type"), errors);
        self.telecom.validate_at(&field_path(path, "telecom"), errors);
        self.address.validate_at(&field_path(path, "address"), errors);
        self.part_of.validate_at(&field_path(path, "partOf"), errors);
        self.contact.validate_at(&field_path(path, "contact"), errors);

        if self.name.as_ref().map_or(true, BoundedText::is_empty) && self.identifier.is_empty() {
            errors.push(
                field_path(path, "name"),
                "an organization must have at least a name or an identifier",
            );
        }
        if self.part_of.as_ref().and_then(Reference::target) == Some(self.key()) {
            errors.push(
                field_path(path, "partOf"),
                "an organization cannot be part of itself",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::ResourceKey;
    use crate::wire;

    const TRUST: &str = r#"resourceType: Organization
id: rhm
identifier:
  - system: https://fhir.nhs.uk/Id/ods-organization-code
    value: RHM
name: University Hospital Southampton
alias:
  - UHS
telecom:
  - system: phone
    value: 023 8077 7222
    use: work
"#;

    #[test]
    fn parses_an_organisation() {
        let org: Organisation = wire::parse_resource_yaml(TRUST).unwrap();
        assert_eq!(org.resource_type, ResourceType::Organization);
        assert_eq!(org.alias, vec!["UHS".to_owned()]);
        assert_eq!(
            org.identifier[0].key().as_deref(),
            Some("https://fhir.nhs.uk/Id/ods-organization-code|RHM")
        );
    }

    #[test]
    fn requires_name_or_identifier() {
        let mut org = Organisation::named(BoundedText::new("Ward 4").unwrap());
        assert!(org.validate().is_ok());

        org.name = None;
        assert!(org.validate().unwrap_err().has_field("name"));
    }

    #[test]
    fn cannot_be_part_of_itself() {
        let mut org = Organisation::named(BoundedText::new("Ward 4").unwrap());
        org.part_of = Some(Reference::to(&ResourceKey::new("Organization", org.id.clone())));
        assert!(org.validate().unwrap_err().has_field("partOf"));
    }
}
