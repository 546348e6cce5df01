//! Field schema: link fields with their deletion policies, and field descriptions for
//! the admin site.
//!
//! A [`ReferenceField`] names the resource types a link may point at, either a single type
//! (`"Organization"`), a disjunction (`"Organization or Practitioner"`) or `"Any"`.
//! Declarations are `const` so that every model can hand out `&'static` fields.

use fhir::{Reference, ResourceKey};
use serde::Serialize;

/// What happens to a referrer when the record it links to is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
    /// Refuse the delete while the link exists.
    Protect,
    /// Delete the referrer as well.
    Cascade,
    /// Clear the link (or remove it from a many-valued field) and keep the referrer.
    Detach,
}

/// A field that links one stored record to another.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ReferenceField {
    pub name: &'static str,
    targets: &'static str,
    pub on_delete: OnDelete,
}

impl ReferenceField {
    pub const ANY: &'static str = "Any";

    pub const fn new(name: &'static str, targets: &'static str, on_delete: OnDelete) -> Self {
        Self {
            name,
            targets,
            on_delete,
        }
    }

    /// Allowed target type names; empty when any type is allowed.
    pub fn targets(&self) -> Vec<&'static str> {
        if self.targets == Self::ANY {
            return Vec::new();
        }
        self.targets
            .split(" or ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Whether `resource_type` may be linked through this field.
    ///
    /// A canonical type URL (`http://hl7.org/fhir/StructureDefinition/Patient`) is
    /// compared by its last path segment.
    pub fn allows(&self, resource_type: &str) -> bool {
        if self.targets == Self::ANY {
            return true;
        }
        let name = resource_type.rsplit('/').next().unwrap_or(resource_type);
        self.targets().iter().any(|t| *t == name)
    }

    /// Check the type a reference claims to point at.
    ///
    /// References with neither a `type` element nor a relative literal reference (absolute
    /// URLs, identifier or display only) cannot be checked and pass.
    pub fn check(&self, reference: &Reference) -> Result<(), String> {
        match reference.target_type() {
            Some(found) if !self.allows(&found) => Err(format!(
                "{} may only refer to {}, not {found}",
                self.name, self.targets
            )),
            _ => Ok(()),
        }
    }
}

/// An outgoing link from a stored record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub field: &'static ReferenceField,
    pub target: ResourceKey,
}

impl Link {
    pub fn new(field: &'static ReferenceField, target: ResourceKey) -> Self {
        Self { field, target }
    }
}

/// Security label of a resource: protects the Coding it points at.
pub static META_SECURITY: ReferenceField =
    ReferenceField::new("meta.security", "Coding", OnDelete::Protect);

/// Extensions on an element or resource.
pub static EXTENSION: ReferenceField =
    ReferenceField::new("extension", "Extension", OnDelete::Detach);

/// Resources contained in a domain resource.
pub static CONTAINED: ReferenceField =
    ReferenceField::new("contained", ReferenceField::ANY, OnDelete::Detach);

/// Organization that issued an identifier.
pub static IDENTIFIER_ASSIGNER: ReferenceField =
    ReferenceField::new("assigner", "Organization", OnDelete::Detach);

/// Custodian of a patient record; an organization cannot go while it manages patients.
pub static MANAGING_ORGANIZATION: ReferenceField =
    ReferenceField::new("managingOrganization", "Organization", OnDelete::Protect);

pub static PART_OF: ReferenceField =
    ReferenceField::new("partOf", "Organization", OnDelete::Detach);

/// Description of one field of a model, for admin forms and the CLI.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub many: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "no_choices")]
    pub choices: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<&'static ReferenceField>,
    /// Maintained by the store; not editable.
    #[serde(skip_serializing_if = "is_false")]
    pub read_only: bool,
}

fn no_choices(choices: &&'static [&'static str]) -> bool {
    choices.is_empty()
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FieldSchema {
    pub const fn new(name: &'static str, kind: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            many: false,
            max_length: None,
            choices: &[],
            reference: None,
            read_only: false,
        }
    }

    pub const fn text(name: &'static str, max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::new(name, "string")
        }
    }

    pub const fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self {
            choices,
            ..Self::new(name, "code")
        }
    }

    pub const fn link(name: &'static str, field: &'static ReferenceField) -> Self {
        Self {
            reference: Some(field),
            ..Self::new(name, "reference")
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn many(self) -> Self {
        Self { many: true, ..self }
    }

    pub const fn read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::{Id, Uri};

    static AUTHOR: ReferenceField =
        ReferenceField::new("author", "Organization or Practitioner", OnDelete::Protect);

    #[test]
    fn disjunction_is_split_into_targets() {
        assert_eq!(AUTHOR.targets(), vec!["Organization", "Practitioner"]);
        assert!(AUTHOR.allows("Practitioner"));
        assert!(AUTHOR.allows("http://hl7.org/fhir/StructureDefinition/Organization"));
        assert!(!AUTHOR.allows("Patient"));
    }

    #[test]
    fn any_allows_everything() {
        assert!(CONTAINED.targets().is_empty());
        assert!(CONTAINED.allows("Basic"));
    }

    #[test]
    fn check_uses_literal_or_declared_type() {
        let to_patient = Reference::to(&ResourceKey::new("Patient", Id::new("p1").unwrap()));
        assert!(AUTHOR.check(&to_patient).is_err());

        let to_org = Reference::to(&ResourceKey::new("Organization", Id::new("o1").unwrap()));
        assert!(AUTHOR.check(&to_org).is_ok());

        let external = Reference {
            reference: Some(Uri::new("https://example.org/fhir/Patient/1").unwrap()),
            ..Reference::default()
        };
        assert!(AUTHOR.check(&external).is_ok());

        let typed = Reference {
            type_: Some(Uri::new("Patient").unwrap()),
            ..external
        };
        let message = AUTHOR.check(&typed).unwrap_err();
        assert!(message.contains("Organization or Practitioner"));
    }

    #[test]
    fn field_schema_builders() {
        let field = FieldSchema::text("display", 255).required();
        assert!(field.required);
        assert_eq!(field.max_length, Some(255));
        let json = serde_json::to_value(FieldSchema::link("partOf", &PART_OF)).unwrap();
        assert_eq!(json["reference"]["on_delete"], "detach");
        assert!(json.get("choices").is_none());
    }
}
