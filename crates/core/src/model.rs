//! Storable models.
//!
//! A [`Model`] is anything the store keeps as a record of its own: the resources, and the
//! datatypes the admin site edits directly (Coding, Period, Identifier, ...). The trait
//! exposes what the store needs beyond serde: the record's id, its metadata, its outgoing
//! links with their deletion policies, and the keys that must be unique within its table.

use crate::schema::{FieldSchema, Link, ReferenceField, CONTAINED, EXTENSION, META_SECURITY};
use crate::CoreResult;
use fhir::resources::FhirResource;
use fhir::{wire, Id, Meta, Reference, ResourceKey, Validate, ValidationErrors};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait Model: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    /// Type name; also names the storage table and the type part of a `Type/id` reference.
    const NAME: &'static str;

    /// Field descriptions, in display order.
    fn fields() -> &'static [FieldSchema];

    fn id(&self) -> Option<&Id>;

    fn set_id(&mut self, id: Id);

    fn meta(&self) -> Option<&Meta> {
        None
    }

    fn meta_mut(&mut self) -> Option<&mut Meta> {
        None
    }

    /// Reference-valued link fields, for target type checks.
    fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
        Vec::new()
    }

    /// Links held as plain ids (foreign keys and many-to-many lists).
    fn key_links(&self) -> Vec<Link> {
        Vec::new()
    }

    /// Remove `link` from this record. Returns false if the record did not hold it.
    fn unlink(&mut self, link: &Link) -> bool;

    /// Keys that must not be shared with another record of the same model.
    fn unique_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Build a record from its JSON form.
    fn from_json(value: serde_json::Value) -> CoreResult<Self> {
        Ok(wire::from_value(Self::NAME, without_blank_id(value))?)
    }

    fn key(&self) -> Option<ResourceKey> {
        self.id().map(|id| ResourceKey::new(Self::NAME, id.clone()))
    }

    /// Every outgoing link that points at a record in the local store.
    fn links(&self) -> Vec<Link> {
        let mut links = self.key_links();
        links.extend(
            self.references()
                .into_iter()
                .filter_map(|(field, reference)| reference.target().map(|t| Link::new(field, t))),
        );
        links
    }

    /// Field validation plus the target type check of every link field.
    fn check(&self) -> CoreResult<()> {
        let mut errors = ValidationErrors::new();
        self.validate_at("", &mut errors);
        for (field, reference) in self.references() {
            if let Err(message) = field.check(reference) {
                errors.push(field.name, message);
            }
        }
        for link in self.key_links() {
            if !link.field.allows(&link.target.resource_type) {
                errors.push(
                    link.field.name,
                    format!("{} cannot link to {}", link.field.name, link.target),
                );
            }
        }
        errors.into_result()?;
        Ok(())
    }
}

pub(crate) fn extension_links(extension: &[Id]) -> impl Iterator<Item = Link> + '_ {
    extension
        .iter()
        .map(|id| Link::new(&EXTENSION, ResourceKey::new("Extension", id.clone())))
}

/// Drop an extension id matching `link`; false if the link is not an extension link.
pub(crate) fn unlink_extension(extension: &mut Vec<Id>, link: &Link) -> bool {
    if !std::ptr::eq(link.field, &EXTENSION) {
        return false;
    }
    let before = extension.len();
    extension.retain(|id| *id != link.target.id);
    extension.len() != before
}

/// Clear an optional reference if it is `link`'s field and points at its target.
pub(crate) fn unlink_reference(
    slot: &mut Option<Reference>,
    field: &'static ReferenceField,
    link: &Link,
) -> bool {
    if !std::ptr::eq(link.field, field) {
        return false;
    }
    if slot.as_ref().and_then(Reference::target).as_ref() == Some(&link.target) {
        *slot = None;
        return true;
    }
    false
}

/// Id links every resource holds: its security label and its extensions.
pub(crate) fn resource_key_links<R: FhirResource>(resource: &R) -> Vec<Link> {
    let mut links: Vec<Link> = resource
        .meta()
        .security
        .iter()
        .map(|id| Link::new(&META_SECURITY, ResourceKey::new("Coding", id.clone())))
        .collect();
    links.extend(extension_links(resource.extension()));
    links
}

pub(crate) fn resource_references<R: FhirResource>(
    resource: &R,
) -> Vec<(&'static ReferenceField, &Reference)> {
    resource
        .contained()
        .iter()
        .map(|reference| (&CONTAINED, reference))
        .collect()
}

pub(crate) fn unlink_resource<R: FhirResource>(resource: &mut R, link: &Link) -> bool {
    if std::ptr::eq(link.field, &META_SECURITY) {
        let meta = resource.meta_mut();
        if meta.security.as_ref() == Some(&link.target.id) {
            meta.security = None;
            return true;
        }
        return false;
    }
    if std::ptr::eq(link.field, &CONTAINED) {
        let Some(contained) = resource.contained_mut() else {
            return false;
        };
        let before = contained.len();
        contained.retain(|r| r.target().as_ref() != Some(&link.target));
        return contained.len() != before;
    }
    match resource.extension_mut() {
        Some(extension) => unlink_extension(extension, link),
        None => false,
    }
}

/// An empty `id` (a blank admin form field) counts as omitted.
pub(crate) fn without_blank_id(mut value: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut value {
        if map.get("id").and_then(|v| v.as_str()) == Some("") {
            map.remove("id");
        }
    }
    value
}

/// Parse a resource from JSON, rejecting a mismatching `resourceType`.
pub(crate) fn resource_from_json<R: FhirResource>(value: serde_json::Value) -> CoreResult<R> {
    Ok(wire::resource_from_value(without_blank_id(value))?)
}
