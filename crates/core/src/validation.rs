//! Input validation utilities.
//!
//! This module contains functions for validating configuration and storage inputs before
//! they are used to build paths or URIs.

use crate::{CoreError, CoreResult};
use fhir::Id;

/// Validates that a namespace string is safe for embedding in a URI authority.
///
/// The namespace is embedded into the base URL of local absolute references:
/// `https://{namespace}/fhir`. Rejects empty strings, pathological lengths and anything
/// outside a conservative ASCII set.
pub fn validate_namespace_safe_for_uri(namespace: &str) -> CoreResult<()> {
    const MAX_NAMESPACE_LEN: usize = 253;

    if namespace.trim().is_empty() {
        return Err(CoreError::InvalidInput("namespace cannot be empty".into()));
    }

    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(CoreError::InvalidInput(format!(
            "namespace exceeds maximum length of {} characters",
            MAX_NAMESPACE_LEN
        )));
    }

    let ok = namespace
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(CoreError::InvalidInput(
            "namespace contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

/// Ids become file names; `.` and `..` would escape the table directory.
pub fn validate_storage_id(id: &Id) -> CoreResult<()> {
    if matches!(id.as_str(), "." | "..") {
        return Err(CoreError::InvalidInput(format!(
            "'{id}' cannot be used as a record id"
        )));
    }
    Ok(())
}
