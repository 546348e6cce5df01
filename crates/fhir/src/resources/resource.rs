use crate::codes::ResourceType;
use crate::datatypes::Reference;
use crate::fields::{Code, Id, Uri};
use crate::narrative::Narrative;
use crate::resources::{base_accessors, domain_resource, validate_domain_parts, FhirResource, Meta};
use crate::validation::{Validate, ValidationErrors};
use serde::{Deserialize, Serialize};

/// The base resource: identity and metadata only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Resource {
    pub resource_type: ResourceType,

    /// Logical id; a fresh one is generated when omitted.
    #[serde(default)]
    pub id: Id,

    #[serde(default)]
    pub meta: Meta,

    /// A set of rules under which this content was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_rules: Option<Uri>,

    /// Language of the resource content, e.g. "en" or "en-US".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Code>,
}

impl Resource {
    pub fn new() -> Self {
        Self {
            resource_type: ResourceType::Resource,
            id: Id::generate(),
            meta: Meta::default(),
            implicit_rules: None,
            language: None,
        }
    }
}

impl Default for Resource {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirResource for Resource {
    const RESOURCE_TYPE: ResourceType = ResourceType::Resource;

    base_accessors!();
}

impl Validate for Resource {
    fn validate_at(&self, _path: &str, _errors: &mut ValidationErrors) {}
}

/// A resource with narrative, contained resources and extensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DomainResource {
    pub resource_type: ResourceType,

    #[serde(default)]
    pub id: Id,

    #[serde(default)]
    pub meta: Meta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_rules: Option<Uri>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Code>,

    /// Text summary of the resource, for human interpretation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Narrative>,

    /// Nested resources, linked by reference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,
}

impl DomainResource {
    pub fn new() -> Self {
        Self {
            resource_type: ResourceType::DomainResource,
            id: Id::generate(),
            meta: Meta::default(),
            implicit_rules: None,
            language: None,
            text: None,
            contained: Vec::new(),
            extension: Vec::new(),
        }
    }
}

impl Default for DomainResource {
    fn default() -> Self {
        Self::new()
    }
}

domain_resource!(DomainResource, ResourceType::DomainResource);

impl Validate for DomainResource {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        validate_domain_parts(&self.contained, path, errors);
    }
}
