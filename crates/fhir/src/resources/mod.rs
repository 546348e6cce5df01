//! FHIR resources.
//!
//! All resources share the `Resource` base fields (`id`, `meta`, `implicitRules`,
//! `language`); domain resources add narrative `text`, `contained` references and
//! `extension` links. The fields are repeated on each struct rather than flattened so
//! that unknown keys stay rejectable.

pub mod meta;
pub mod organisation;
pub mod patient;
pub mod resource;
pub mod structure_definition;
pub mod value_set;

pub use meta::Meta;
pub use organisation::Organisation;
pub use patient::Patient;
pub use resource::{DomainResource, Resource};
pub use structure_definition::StructureDefinition;
pub use value_set::{ConceptReference, ConceptSet, ValueSet, ValueSetCompose};

use crate::codes::ResourceType;
use crate::datatypes::{Reference, ResourceKey};
use crate::fields::Id;
use crate::validation::{field_path, index_path, Validate, ValidationErrors};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Access to the base fields every resource carries.
pub trait FhirResource: Serialize + DeserializeOwned + Validate {
    const RESOURCE_TYPE: ResourceType;

    /// The `resourceType` value found on the record.
    fn resource_type(&self) -> ResourceType;

    fn id(&self) -> &Id;

    fn set_id(&mut self, id: Id);

    fn meta(&self) -> &Meta;

    fn meta_mut(&mut self) -> &mut Meta;

    fn contained(&self) -> &[Reference] {
        &[]
    }

    fn contained_mut(&mut self) -> Option<&mut Vec<Reference>> {
        None
    }

    fn extension(&self) -> &[Id] {
        &[]
    }

    fn extension_mut(&mut self) -> Option<&mut Vec<Id>> {
        None
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(Self::RESOURCE_TYPE.as_str(), self.id().clone())
    }
}

/// Resources that are never hard-deleted, only taken out of use.
pub trait Retire {
    fn retire(&mut self);
    fn is_retired(&self) -> bool;
}

macro_rules! base_accessors {
    () => {
        fn resource_type(&self) -> $crate::codes::ResourceType {
            self.resource_type
        }

        fn id(&self) -> &$crate::fields::Id {
            &self.id
        }

        fn set_id(&mut self, id: $crate::fields::Id) {
            self.id = id;
        }

        fn meta(&self) -> &$crate::resources::Meta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut $crate::resources::Meta {
            &mut self.meta
        }
    };
}

macro_rules! domain_resource {
    ($ty:ty, $resource_type:expr) => {
        impl $crate::resources::FhirResource for $ty {
            const RESOURCE_TYPE: $crate::codes::ResourceType = $resource_type;

            $crate::resources::base_accessors!();

            fn contained(&self) -> &[$crate::datatypes::Reference] {
                &self.contained
            }

            fn contained_mut(&mut self) -> Option<&mut Vec<$crate::datatypes::Reference>> {
                Some(&mut self.contained)
            }

            fn extension(&self) -> &[$crate::fields::Id] {
                &self.extension
            }

            fn extension_mut(&mut self) -> Option<&mut Vec<$crate::fields::Id>> {
                Some(&mut self.extension)
            }
        }
    };
}

pub(crate) use base_accessors;
pub(crate) use domain_resource;

/// Rules shared by every domain resource.
pub(crate) fn validate_domain_parts(
    contained: &[Reference],
    path: &str,
    errors: &mut ValidationErrors,
) {
    for (i, reference) in contained.iter().enumerate() {
        let at = index_path(&field_path(path, "contained"), i);
        reference.validate_at(&at, errors);
        if reference.target().is_none() {
            errors.push(at, "contained entries must reference a stored resource (Type/id)");
        }
    }
}
