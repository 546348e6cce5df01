//! YAML and JSON boundary helpers.
//!
//! Parsing uses `serde_path_to_error` so that a schema mismatch names the failing field
//! (e.g. `identifier[0].system`) rather than only a line and column. Resource parsing
//! additionally checks `resourceType` and runs cross-field validation.

use crate::resources::FhirResource;
use crate::validation::Validate;
use crate::{FhirError, FhirResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn translation_error<E: std::fmt::Display>(
    label: &str,
    err: serde_path_to_error::Error<E>,
) -> FhirError {
    let path = err.path().to_string();
    FhirError::Translation(format!(
        "{label} schema mismatch at {path}: {}",
        err.into_inner()
    ))
}

/// Deserialise YAML text into `T`, reporting the path of the first mismatching field.
pub fn parse_yaml<T: DeserializeOwned>(label: &str, text: &str) -> FhirResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|e| translation_error(label, e))
}

/// Deserialise JSON text into `T`, reporting the path of the first mismatching field.
pub fn parse_json<T: DeserializeOwned>(label: &str, text: &str) -> FhirResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let value = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| translation_error(label, e))?;
    deserializer.end()?;
    Ok(value)
}

/// Deserialise an already parsed JSON value into `T`.
pub fn from_value<T: DeserializeOwned>(label: &str, value: serde_json::Value) -> FhirResult<T> {
    serde_path_to_error::deserialize(value).map_err(|e| translation_error(label, e))
}

pub fn render_yaml<T: Serialize>(value: &T) -> FhirResult<String> {
    Ok(serde_yaml::to_string(value)?)
}

pub fn render_json<T: Serialize>(value: &T) -> FhirResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Convert a serialisable value into a JSON value.
pub fn to_value<T: Serialize>(value: &T) -> FhirResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Check `resourceType`, deserialise and validate a resource held as a JSON value.
pub fn resource_from_value<R: FhirResource>(value: serde_json::Value) -> FhirResult<R> {
    let expected = R::RESOURCE_TYPE.as_str();
    match value.get("resourceType") {
        Some(serde_json::Value::String(found)) if found == expected => {}
        Some(serde_json::Value::String(found)) => {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType '{expected}', got '{found}'"
            )));
        }
        Some(other) => {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType '{expected}', got {other}"
            )));
        }
        None => {
            return Err(FhirError::InvalidInput(format!(
                "Missing resourceType, expected '{expected}'"
            )));
        }
    }

    let resource: R = from_value(expected, value)?;
    resource.validate()?;
    Ok(resource)
}

/// Parse a resource from YAML text.
pub fn parse_resource_yaml<R: FhirResource>(text: &str) -> FhirResult<R> {
    let value: serde_json::Value = parse_yaml(R::RESOURCE_TYPE.as_str(), text)?;
    resource_from_value(value)
}

/// Parse a resource from JSON text.
pub fn parse_resource_json<R: FhirResource>(text: &str) -> FhirResult<R> {
    let value: serde_json::Value = parse_json(R::RESOURCE_TYPE.as_str(), text)?;
    resource_from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::Period;
    use crate::resources::Resource;

    #[test]
    fn mismatch_names_the_field_path() {
        let input = "start: 2024-01-01T00:00:00Z\nend: yesterday\n";
        let err = parse_yaml::<Period>("Period", input).unwrap_err();
        match err {
            FhirError::Translation(msg) => {
                assert!(msg.starts_with("Period schema mismatch at end"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn json_trailing_garbage_is_rejected() {
        assert!(parse_json::<serde_json::Value>("x", "{} {").is_err());
    }

    #[test]
    fn missing_resource_type_is_invalid_input() {
        let err = parse_resource_json::<Resource>(r#"{"id": "r1"}"#).unwrap_err();
        assert!(matches!(err, FhirError::InvalidInput(msg) if msg.contains("Missing resourceType")));
    }

    #[test]
    fn validation_failures_surface_with_field_paths() {
        let period = serde_json::json!({
            "start": "2024-02-01T00:00:00Z",
            "end": "2024-01-01T00:00:00Z"
        });
        let parsed: Period = from_value("Period", period).unwrap();
        let err = FhirError::from(parsed.validate().unwrap_err());
        assert!(err.to_string().contains("end"));
    }

    #[test]
    fn renders_json_and_yaml() {
        let resource = Resource::new();
        let json = render_json(&resource).unwrap();
        assert!(json.contains("\"resourceType\": \"Resource\""));
        let yaml = render_yaml(&resource).unwrap();
        assert!(yaml.contains("resourceType: Resource"));
    }
}
