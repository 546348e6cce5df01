use crate::codes::NameUse;
use crate::datatypes::Period;
use crate::fields::Id;
use crate::validation::{field_path, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};

/// A human's name with the ability to identify parts and usage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HumanName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<NameUse>,

    /// Text representation of the full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Family name (surname).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Given names (first name, middle names).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

impl HumanName {
    pub fn new(use_: Option<NameUse>, family: Option<String>, given: Vec<String>) -> Self {
        Self {
            use_,
            family,
            given,
            ..Self::default()
        }
    }

    /// `text` if set, otherwise prefix, given, family and suffix joined by spaces.
    pub fn display(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return text.to_owned();
        }
        self.prefix
            .iter()
            .chain(self.given.iter())
            .chain(self.family.iter())
            .chain(self.suffix.iter())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Validate for HumanName {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        self.period.validate_at(&field_path(path, "period"), errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_text() {
        let mut name = HumanName::new(
            Some(NameUse::Official),
            Some("Williams".into()),
            vec!["Sarah".into(), "Jane".into()],
        );
        assert_eq!(name.display(), "Sarah Jane Williams");

        name.prefix = vec!["Dr.".into()];
        assert_eq!(name.display(), "Dr. Sarah Jane Williams");

        name.text = Some("Sally Williams".into());
        assert_eq!(name.display(), "Sally Williams");
    }
}
