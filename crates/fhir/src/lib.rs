//! FHIR data model for the MedUX admin store.
//!
//! This crate provides **field types**, **datatypes** and **resources** for a slice of
//! FHIR R4, together with YAML/JSON boundary helpers:
//! - field wrappers that validate on construction and on deserialise
//! - general-purpose datatypes (Coding, Identifier, Reference, ...)
//! - resources (Resource, DomainResource, Patient, Organization, ValueSet,
//!   StructureDefinition)
//! - cross-field validation with field paths
//!
//! This crate does not persist anything; storage and on-delete policies live in
//! `medux-core`.

pub mod codes;
pub mod datatypes;
pub mod fields;
pub mod narrative;
pub mod resources;
pub mod validation;
pub mod wire;

pub use codes::{
    AddressType, AddressUse, AdministrativeGender, ContactPointSystem, ContactPointUse,
    IdentifierUse, NameUse, NarrativeStatus, PublicationStatus, ResourceType,
    StructureDefinitionKind, TypeDerivationRule,
};
pub use datatypes::{
    Address, Attachment, CodeableConcept, Coding, ContactDetail, ContactPoint, Extension,
    HumanName, Identifier, Period, Reference, ResourceKey,
};
pub use fields::{Base64Text, Code, FieldError, Id, Instant, Markdown, Oid, Uri};
pub use narrative::Narrative;
pub use resources::{
    DomainResource, FhirResource, Meta, Organisation, Patient, Resource, Retire,
    StructureDefinition, ValueSet,
};
pub use validation::{FieldIssue, Validate, ValidationErrors};

/// Errors returned by the `fhir` crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid field: {0}")]
    Field(#[from] FieldError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
