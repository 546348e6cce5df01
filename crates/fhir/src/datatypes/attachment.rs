use crate::fields::{Base64Text, Code, FieldError, Id, Instant, Uri};
use crate::validation::{field_path, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Content in a format defined elsewhere, inline (base64 `data`) or by `url`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    /// Mime type of the content, with charset etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Code>,

    /// Human language of the content (BCP-47).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Code>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Base64Text>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Uri>,

    /// Number of bytes of content (if a url is provided).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// SHA-1 of the data, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<Base64Text>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<Instant>,
}

impl Attachment {
    /// Inline text content.
    pub fn inline_text(content_type: Code, text: &str) -> Self {
        Self {
            content_type: Some(content_type),
            data: Some(Base64Text::encode(text)),
            size: Some(text.len() as u64),
            ..Self::default()
        }
    }

    /// The inline payload, if any.
    pub fn decoded_data(&self) -> Result<Option<Vec<u8>>, FieldError> {
        self.data.as_ref().map(Base64Text::decode_bytes).transpose()
    }
}

impl Validate for Attachment {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        if self.data.is_some() && self.content_type.is_none() {
            errors.push(
                field_path(path, "contentType"),
                "inline data requires a contentType",
            );
        }
        if let (Some(size), Ok(Some(bytes))) = (self.size, self.decoded_data()) {
            if bytes.len() as u64 != size {
                errors.push(
                    field_path(path, "size"),
                    format!("size {size} does not match {} bytes of data", bytes.len()),
                );
            }
        }
    }
}
