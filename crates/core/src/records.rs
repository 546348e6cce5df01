//! [`Model`] implementations for the stored FHIR types.

use crate::model::{
    extension_links, resource_from_json, resource_key_links, resource_references,
    unlink_extension, unlink_reference, unlink_resource, Model,
};
use crate::schema::{
    FieldSchema, Link, ReferenceField, CONTAINED, EXTENSION, IDENTIFIER_ASSIGNER,
    MANAGING_ORGANIZATION, META_SECURITY, PART_OF,
};
use crate::CoreResult;
use fhir::codes::{
    AdministrativeGender, ContactPointSystem, ContactPointUse, IdentifierUse, PublicationStatus,
    StructureDefinitionKind, TypeDerivationRule,
};
use fhir::datatypes::{ContactDetail, ContactPoint, Extension, Identifier, Period};
use fhir::resources::FhirResource;
use fhir::{
    Coding, DomainResource, Id, Meta, Organisation, Patient, Reference, Resource,
    StructureDefinition, ValueSet,
};

macro_rules! resource_fields {
    ($($extra:expr),* $(,)?) => {
        &[
            FieldSchema::new("resourceType", "code").required().read_only(),
            FieldSchema::new("id", "id"),
            FieldSchema::new("meta.versionId", "id").read_only(),
            FieldSchema::new("meta.created", "instant").read_only(),
            FieldSchema::new("meta.lastUpdated", "instant").read_only(),
            FieldSchema::new("meta.profile", "uri"),
            FieldSchema::link("meta.security", &META_SECURITY),
            FieldSchema::new("implicitRules", "uri"),
            FieldSchema::new("language", "code"),
            $($extra),*
        ]
    };
}

macro_rules! domain_fields {
    ($($extra:expr),* $(,)?) => {
        resource_fields![
            FieldSchema::new("text", "narrative"),
            FieldSchema::link("contained", &CONTAINED).many(),
            FieldSchema::link("extension", &EXTENSION).many(),
            $($extra),*
        ]
    };
}

macro_rules! element_fields {
    ($($extra:expr),* $(,)?) => {
        &[
            FieldSchema::new("id", "id"),
            FieldSchema::link("extension", &EXTENSION).many(),
            $($extra),*
        ]
    };
}

static RESOURCE_FIELDS: &[FieldSchema] = resource_fields![];

static DOMAIN_RESOURCE_FIELDS: &[FieldSchema] = domain_fields![];

static STRUCTURE_DEFINITION_FIELDS: &[FieldSchema] = domain_fields![
    FieldSchema::new("url", "uri").required(),
    FieldSchema::new("identifier", "Identifier").many(),
    FieldSchema::text("version", 35),
    FieldSchema::text("name", 255).required(),
    FieldSchema::text("title", 255),
    FieldSchema::choice("status", PublicationStatus::CODES).required(),
    FieldSchema::new("experimental", "boolean"),
    FieldSchema::new("date", "instant"),
    FieldSchema::text("publisher", 255),
    FieldSchema::new("contact", "ContactDetail").many(),
    FieldSchema::new("description", "markdown"),
    FieldSchema::new("useContext", "Coding").many(),
    FieldSchema::new("purpose", "markdown"),
    FieldSchema::choice("kind", StructureDefinitionKind::CODES).required(),
    FieldSchema::new("abstract", "boolean").required(),
    FieldSchema::new("type", "uri").required(),
    FieldSchema::new("baseDefinition", "uri"),
    FieldSchema::choice("derivation", TypeDerivationRule::CODES),
];

static VALUE_SET_FIELDS: &[FieldSchema] = domain_fields![
    FieldSchema::new("url", "uri"),
    FieldSchema::new("identifier", "Identifier").many(),
    FieldSchema::text("version", 35),
    FieldSchema::text("name", 255),
    FieldSchema::text("title", 255),
    FieldSchema::choice("status", PublicationStatus::CODES).required(),
    FieldSchema::new("experimental", "boolean"),
    FieldSchema::new("date", "instant"),
    FieldSchema::text("publisher", 255),
    FieldSchema::new("contact", "ContactDetail").many(),
    FieldSchema::new("description", "markdown"),
    FieldSchema::new("useContext", "Coding").many(),
    FieldSchema::new("immutable", "boolean"),
    FieldSchema::new("purpose", "markdown"),
    FieldSchema::new("compose", "ValueSetCompose"),
];

static PATIENT_FIELDS: &[FieldSchema] = domain_fields![
    FieldSchema::new("identifier", "Identifier").many(),
    FieldSchema::new("active", "boolean"),
    FieldSchema::new("name", "HumanName").many(),
    FieldSchema::new("telecom", "ContactPoint").many(),
    FieldSchema::choice("gender", AdministrativeGender::CODES),
    FieldSchema::new("birthDate", "date"),
    FieldSchema::new("deceasedBoolean", "boolean"),
    FieldSchema::new("address", "Address").many(),
    FieldSchema::new("contact", "ContactDetail").many(),
    FieldSchema::link("managingOrganization", &MANAGING_ORGANIZATION),
];

static ORGANISATION_FIELDS: &[FieldSchema] = domain_fields![
    FieldSchema::new("identifier", "Identifier").many(),
    FieldSchema::new("active", "boolean"),
    FieldSchema::new("type", "CodeableConcept").many(),
    FieldSchema::text("name", 255),
    FieldSchema::new("alias", "string").many(),
    FieldSchema::new("telecom", "ContactPoint").many(),
    FieldSchema::new("address", "Address").many(),
    FieldSchema::link("partOf", &PART_OF),
    FieldSchema::new("contact", "ContactDetail").many(),
];

static CODING_FIELDS: &[FieldSchema] = element_fields![
    FieldSchema::new("system", "uri"),
    FieldSchema::text("version", 35),
    FieldSchema {
        max_length: Some(64),
        ..FieldSchema::new("code", "code").required()
    },
    FieldSchema::text("display", 255),
    FieldSchema::new("userSelected", "boolean"),
];

static PERIOD_FIELDS: &[FieldSchema] = element_fields![
    FieldSchema::new("start", "instant"),
    FieldSchema::new("end", "instant"),
];

static IDENTIFIER_FIELDS: &[FieldSchema] = element_fields![
    FieldSchema::choice("use", IdentifierUse::CODES),
    FieldSchema::new("type", "CodeableConcept"),
    FieldSchema::new("system", "uri"),
    FieldSchema::text("value", 255),
    FieldSchema::new("period", "Period"),
    FieldSchema::link("assigner", &IDENTIFIER_ASSIGNER),
];

static CONTACT_DETAIL_FIELDS: &[FieldSchema] = element_fields![
    FieldSchema::text("name", 255),
    FieldSchema::new("telecom", "ContactPoint").many(),
];

static CONTACT_POINT_FIELDS: &[FieldSchema] = element_fields![
    FieldSchema::choice("system", ContactPointSystem::CODES),
    FieldSchema::text("value", 255),
    FieldSchema::choice("use", ContactPointUse::CODES),
    FieldSchema::new("rank", "positiveInt"),
    FieldSchema::new("period", "Period"),
];

static EXTENSION_FIELDS: &[FieldSchema] = element_fields![
    FieldSchema::new("url", "uri").required(),
    FieldSchema::new("valueString", "string"),
    FieldSchema::new("valueBoolean", "boolean"),
    FieldSchema::new("valueInteger", "integer"),
    FieldSchema::new("valueCode", "code"),
    FieldSchema::new("valueUri", "uri"),
];

fn identifier_keys(identifiers: &[Identifier]) -> impl Iterator<Item = String> + '_ {
    identifiers
        .iter()
        .filter_map(Identifier::key)
        .map(|key| format!("identifier:{key}"))
}

fn assigner_references(
    identifiers: &[Identifier],
) -> impl Iterator<Item = (&'static ReferenceField, &Reference)> + '_ {
    identifiers
        .iter()
        .filter_map(|identifier| identifier.assigner.as_deref())
        .map(|assigner| (&IDENTIFIER_ASSIGNER, assigner))
}

/// Clear every assigner that is `link`'s target. False if none was cleared.
fn unlink_assigners(identifiers: &mut [Identifier], link: &Link) -> bool {
    if !std::ptr::eq(link.field, &IDENTIFIER_ASSIGNER) {
        return false;
    }
    let mut cleared = false;
    for identifier in identifiers {
        let points_at_target = identifier
            .assigner
            .as_ref()
            .and_then(|a| a.target())
            .is_some_and(|t| t == link.target);
        if points_at_target {
            identifier.assigner = None;
            cleared = true;
        }
    }
    cleared
}

/// Base accessors shared by every resource model.
macro_rules! resource_model_base {
    ($name:literal, $fields:ident) => {
        const NAME: &'static str = $name;

        fn fields() -> &'static [FieldSchema] {
            $fields
        }

        fn id(&self) -> Option<&Id> {
            Some(FhirResource::id(self))
        }

        fn set_id(&mut self, id: Id) {
            FhirResource::set_id(self, id);
        }

        fn meta(&self) -> Option<&Meta> {
            Some(FhirResource::meta(self))
        }

        fn meta_mut(&mut self) -> Option<&mut Meta> {
            Some(FhirResource::meta_mut(self))
        }

        fn key_links(&self) -> Vec<Link> {
            resource_key_links(self)
        }

        fn from_json(value: serde_json::Value) -> CoreResult<Self> {
            resource_from_json(value)
        }
    };
}

/// Id accessors and extension links shared by every datatype model.
macro_rules! element_model_base {
    ($name:literal, $fields:ident) => {
        const NAME: &'static str = $name;

        fn fields() -> &'static [FieldSchema] {
            $fields
        }

        fn id(&self) -> Option<&Id> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: Id) {
            self.id = Some(id);
        }

        fn key_links(&self) -> Vec<Link> {
            extension_links(&self.extension).collect()
        }
    };
}

impl Model for Resource {
    resource_model_base!("Resource", RESOURCE_FIELDS);

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_resource(self, link)
    }
}

impl Model for DomainResource {
    resource_model_base!("DomainResource", DOMAIN_RESOURCE_FIELDS);

    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        resource_references(self)
    }

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_resource(self, link)
    }
}

impl Model for StructureDefinition {
    resource_model_base!("StructureDefinition", STRUCTURE_DEFINITION_FIELDS);

    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        let mut references = resource_references(self);
        references.extend(assigner_references(&self.identifier));
        references
    }

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_assigners(&mut self.identifier, link) || unlink_resource(self, link)
    }

    fn unique_keys(&self) -> Vec<String> {
        let mut keys = vec![format!("canonical:{}", self.canonical_key())];
        keys.extend(identifier_keys(&self.identifier));
        keys
    }
}

impl Model for ValueSet {
    resource_model_base!("ValueSet", VALUE_SET_FIELDS);

    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        let mut references = resource_references(self);
        references.extend(assigner_references(&self.identifier));
        references
    }

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_assigners(&mut self.identifier, link) || unlink_resource(self, link)
    }

    fn unique_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .canonical_key()
            .map(|key| format!("canonical:{key}"))
            .into_iter()
            .collect();
        keys.extend(identifier_keys(&self.identifier));
        keys
    }
}

impl Model for Patient {
    resource_model_base!("Patient", PATIENT_FIELDS);

    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        let mut references = resource_references(self);
        references.extend(assigner_references(&self.identifier));
        if let Some(org) = &self.managing_organization {
            references.push((&MANAGING_ORGANIZATION, org));
        }
        references
    }

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_reference(&mut self.managing_organization, &MANAGING_ORGANIZATION, link)
            || unlink_assigners(&mut self.identifier, link)
            || unlink_resource(self, link)
    }

    fn unique_keys(&self) -> Vec<String> {
        identifier_keys(&self.identifier).collect()
    }
}

impl Model for Organisation {
    resource_model_base!("Organization", ORGANISATION_FIELDS);

    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        let mut references = resource_references(self);
        references.extend(assigner_references(&self.identifier));
        if let Some(parent) = &self.part_of {
            references.push((&PART_OF, parent));
        }
        references
    }

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_reference(&mut self.part_of, &PART_OF, link)
            || unlink_assigners(&mut self.identifier, link)
            || unlink_resource(self, link)
    }

    fn unique_keys(&self) -> Vec<String> {
        identifier_keys(&self.identifier).collect()
    }
}

impl Model for Coding {
    element_model_base!("Coding", CODING_FIELDS);

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_extension(&mut self.extension, link)
    }
}

impl Model for Period {
    element_model_base!("Period", PERIOD_FIELDS);

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_extension(&mut self.extension, link)
    }
}

impl Model for Identifier {
    element_model_base!("Identifier", IDENTIFIER_FIELDS);

    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        assigner_references(std::slice::from_ref(self)).collect()
    }

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_assigners(std::slice::from_mut(self), link)
            || unlink_extension(&mut self.extension, link)
    }

    fn unique_keys(&self) -> Vec<String> {
        identifier_keys(std::slice::from_ref(self)).collect()
    }
}

impl Model for ContactDetail {
    element_model_base!("ContactDetail", CONTACT_DETAIL_FIELDS);

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_extension(&mut self.extension, link)
    }
}

impl Model for ContactPoint {
    element_model_base!("ContactPoint", CONTACT_POINT_FIELDS);

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_extension(&mut self.extension, link)
    }
}

impl Model for Extension {
    element_model_base!("Extension", EXTENSION_FIELDS);

    fn unlink(&mut self, link: &Link) -> bool {
        unlink_extension(&mut self.extension, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::{ResourceKey, Uri};
    use medux_types::BoundedText;
    use serde_json::json;

    fn key(resource_type: &str, id: &str) -> ResourceKey {
        ResourceKey::new(resource_type, Id::new(id).unwrap())
    }

    #[test]
    fn patient_links_cover_security_extensions_and_references() {
        let mut patient = Patient::new();
        patient.meta.security = Some(Id::new("restricted").unwrap());
        patient.extension.push(Id::new("ext-1").unwrap());
        patient.contained.push(Reference::to(&key("Organization", "o2")));
        patient.managing_organization = Some(Reference::to(&key("Organization", "o1")));

        let links = Model::links(&patient);
        let targets: Vec<String> = links.iter().map(|l| l.target.to_string()).collect();
        assert_eq!(
            targets,
            vec![
                "Coding/restricted",
                "Extension/ext-1",
                "Organization/o2",
                "Organization/o1"
            ]
        );
        assert!(std::ptr::eq(links[3].field, &MANAGING_ORGANIZATION));
    }

    #[test]
    fn unlink_only_touches_the_matching_field() {
        let mut org = Organisation::named(BoundedText::new("Ward 4").unwrap());
        org.part_of = Some(Reference::to(&key("Organization", "trust")));
        org.contained.push(Reference::to(&key("Organization", "trust")));

        assert!(org.unlink(&Link::new(&PART_OF, key("Organization", "trust"))));
        assert!(org.part_of.is_none());
        assert_eq!(org.contained.len(), 1);

        assert!(org.unlink(&Link::new(&CONTAINED, key("Organization", "trust"))));
        assert!(org.contained.is_empty());
        assert!(!org.unlink(&Link::new(&CONTAINED, key("Organization", "trust"))));
    }

    #[test]
    fn check_rejects_wrong_target_type() {
        let mut patient = Patient::new();
        patient.managing_organization = Some(Reference::to(&key("Patient", "p2")));
        let err = patient.check().unwrap_err();
        match err {
            crate::CoreError::Validation(errors) => {
                assert!(errors.has_field("managingOrganization"));
            }
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    fn assigned_identifier(assigner: ResourceKey) -> Identifier {
        let mut identifier = Identifier::new(
            Uri::new("https://fhir.nhs.uk/Id/nhs-number").unwrap(),
            BoundedText::new("9000000009").unwrap(),
        );
        identifier.assigner = Some(Box::new(Reference::to(&assigner)));
        identifier
    }

    #[test]
    fn nested_identifier_assigner_must_be_an_organization() {
        let mut patient = Patient::new();
        patient
            .identifier
            .push(assigned_identifier(key("Patient", "ghost")));

        match patient.check().unwrap_err() {
            crate::CoreError::Validation(errors) => assert!(errors.has_field("assigner")),
            other => panic!("expected Validation error, got {other:?}"),
        }

        let mut value_set = ValueSet::new(PublicationStatus::Active);
        value_set
            .identifier
            .push(assigned_identifier(key("Organization", "trust")));
        assert!(value_set.check().is_ok());
        let links = Model::links(&value_set);
        assert_eq!(links.len(), 1);
        assert!(std::ptr::eq(links[0].field, &IDENTIFIER_ASSIGNER));
        assert_eq!(links[0].target, key("Organization", "trust"));
    }

    #[test]
    fn unlink_clears_nested_identifier_assigners() {
        let mut org = Organisation::named(BoundedText::new("Ward 4").unwrap());
        org.identifier
            .push(assigned_identifier(key("Organization", "trust")));
        org.identifier
            .push(assigned_identifier(key("Organization", "other")));

        let link = Link::new(&IDENTIFIER_ASSIGNER, key("Organization", "trust"));
        assert!(org.unlink(&link));
        assert!(org.identifier[0].assigner.is_none());
        assert!(org.identifier[1].assigner.is_some());
        assert!(!org.unlink(&link));
    }

    #[test]
    fn identifier_unique_key_uses_system_and_value() {
        let identifier = Identifier::new(
            Uri::new("https://fhir.nhs.uk/Id/nhs-number").unwrap(),
            BoundedText::new("9000000009").unwrap(),
        );
        assert_eq!(
            identifier.unique_keys(),
            vec!["identifier:https://fhir.nhs.uk/Id/nhs-number|9000000009".to_owned()]
        );
    }

    #[test]
    fn resource_json_with_wrong_type_is_rejected() {
        let err = <Patient as Model>::from_json(json!({"resourceType": "ValueSet"})).unwrap_err();
        assert!(err.to_string().contains("Expected resourceType 'Patient'"));
    }

    #[test]
    fn blank_id_counts_as_omitted() {
        let coding = <Coding as Model>::from_json(json!({"id": "", "code": "abc"})).unwrap();
        assert!(coding.id.is_none());
    }

    #[test]
    fn every_model_describes_its_fields() {
        assert_eq!(<Resource as Model>::fields()[1].name, "id");
        assert!(<Patient as Model>::fields()
            .iter()
            .any(|f| f.name == "managingOrganization"));
        let status = <ValueSet as Model>::fields()
            .iter()
            .find(|f| f.name == "status")
            .unwrap();
        assert_eq!(status.choices, PublicationStatus::CODES);
        assert!(status.required);
    }
}
