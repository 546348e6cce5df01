use crate::fields::{Code, Id, Uri};
use crate::validation::{Validate, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Additional content defined by implementations, identified by `url`.
///
/// Carries either exactly one `value[x]` or nested extensions (linked by id), never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Extension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    /// Identifies the meaning of the extension.
    pub url: Uri,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_code: Option<Code>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<Uri>,
}

impl Extension {
    pub fn new(url: Uri) -> Self {
        Self {
            id: None,
            extension: Vec::new(),
            url,
            value_string: None,
            value_boolean: None,
            value_integer: None,
            value_code: None,
            value_uri: None,
        }
    }

    /// Names of the `value[x]` elements that are set.
    pub fn present_values(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.value_string.is_some() {
            present.push("valueString");
        }
        if self.value_boolean.is_some() {
            present.push("valueBoolean");
        }
        if self.value_integer.is_some() {
            present.push("valueInteger");
        }
        if self.value_code.is_some() {
            present.push("valueCode");
        }
        if self.value_uri.is_some() {
            present.push("valueUri");
        }
        present
    }
}

impl Validate for Extension {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        let values = self.present_values();
        if values.len() > 1 {
            errors.push(
                path,
                format!("only one value[x] is allowed, found {}", values.join(", ")),
            );
        }
        match (values.is_empty(), self.extension.is_empty()) {
            (true, true) => errors.push(path, "an extension needs a value or nested extensions"),
            (false, false) => errors.push(
                path,
                "an extension must have either a value or nested extensions, not both",
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext() -> Extension {
        Extension::new(Uri::new("http://example.org/fhir/StructureDefinition/eye-colour").unwrap())
    }

    #[test]
    fn single_value_is_accepted() {
        let mut e = ext();
        e.value_string = Some("blue".into());
        assert!(e.validate().is_ok());
    }

    #[test]
    fn two_values_are_rejected() {
        let mut e = ext();
        e.value_string = Some("blue".into());
        e.value_boolean = Some(true);
        assert!(e.validate().unwrap_err().to_string().contains("only one value"));
    }

    #[test]
    fn empty_extension_is_rejected() {
        assert!(ext().validate().is_err());
    }

    #[test]
    fn nested_only_is_accepted() {
        let mut e = ext();
        e.extension.push(Id::new("ext-child").unwrap());
        assert!(e.validate().is_ok());
    }
}
