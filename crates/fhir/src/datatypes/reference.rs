//! References from one resource to another.
//!
//! A reference finds its target in up to three ways: a literal `reference` URI (relative
//! `Type/id`, absolute URL, or URN), a logical `identifier`, or a `display` text. At least
//! one must be present.

use crate::datatypes::Identifier;
use crate::fields::{Id, Uri};
use crate::validation::{field_path, Validate, ValidationErrors};
use medux_types::BoundedText;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of a locally stored record: its type name and logical id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub resource_type: String,
    pub id: Id,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, id: Id) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
        }
    }

    /// Parse a relative literal reference `Type/id` or `Type/id/_history/n`.
    ///
    /// Returns `None` for anything that is not a relative reference.
    pub fn parse(literal: &str) -> Option<Self> {
        if literal.contains("://") || literal.starts_with("urn:") || literal.starts_with('#') {
            return None;
        }
        let mut parts = literal.split('/');
        let resource_type = parts.next()?;
        let id = parts.next()?;
        match (parts.next(), parts.next(), parts.next()) {
            (None, None, None) => {}
            (Some("_history"), Some(version), None) if !version.is_empty() => {}
            _ => return None,
        }
        if resource_type.is_empty()
            || !resource_type.starts_with(|c: char| c.is_ascii_uppercase())
            || !resource_type.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(Self::new(resource_type, Id::new(id).ok()?))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// A reference from one resource to another.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    /// Literal reference: relative, internal or absolute URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Uri>,

    /// Type the reference refers to (e.g. "Patient").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<Uri>,

    /// Logical reference, when a literal reference is not known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Box<Identifier>>,

    /// Text alternative for the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<BoundedText<255>>,
}

impl Reference {
    /// A literal reference to a stored record.
    pub fn to(key: &ResourceKey) -> Self {
        Self {
            reference: Uri::new(&key.to_string()).ok(),
            ..Self::default()
        }
    }

    /// The stored record this reference points at, if it is a relative literal reference.
    pub fn target(&self) -> Option<ResourceKey> {
        self.reference
            .as_ref()
            .and_then(|uri| ResourceKey::parse(uri.as_str()))
    }

    /// The type this reference claims to point at: the `type` element, else the type part
    /// of a relative literal reference.
    pub fn target_type(&self) -> Option<String> {
        self.type_
            .as_ref()
            .map(|t| t.as_str().to_owned())
            .or_else(|| self.target().map(|key| key.resource_type))
    }

    /// Reference to something outside the local store (absolute URL / URN) or known only
    /// by identifier or display.
    pub fn is_external(&self) -> bool {
        self.target().is_none()
    }
}

impl Validate for Reference {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        if self.reference.is_none() && self.identifier.is_none() && self.display.is_none() {
            errors.push(
                path,
                "a reference needs at least one of reference, identifier or display",
            );
        }

        if let Some(literal) = &self.reference {
            let s = literal.as_str();
            let relative = !literal.is_absolute() && !s.starts_with('#');
            if relative && ResourceKey::parse(s).is_none() {
                errors.push(
                    field_path(path, "reference"),
                    format!("'{s}' is not a relative reference of the form Type/id"),
                );
            }
        }

        if let (Some(declared), Some(key)) = (&self.type_, self.target()) {
            if declared.as_str() != key.resource_type {
                errors.push(
                    field_path(path, "type"),
                    format!(
                        "type '{}' does not match referenced type '{}'",
                        declared, key.resource_type
                    ),
                );
            }
        }

        self.identifier
            .validate_at(&field_path(path, "identifier"), errors);
    }
}
