//! Human-readable narrative attached to a domain resource.
//!
//! The XHTML content SHALL NOT contain a head, a body element, external stylesheet
//! references, deprecated elements, scripts, forms, base/link/xlink, frames, iframes,
//! objects or event related attributes (e.g. `onClick`). Narrative must be inert so
//! text can be extracted from it without executing anything.

use crate::codes::NarrativeStatus;
use crate::fields::FieldError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn forbidden_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)<\s*(head|body|script|style|form|input|button|iframe|frame|frameset|object|embed|applet|base|link|meta)\b",
        )
        .expect("narrative element regex must compile")
    })
}

fn active_attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<[^>]*?(\son[a-z]+\s*=|xlink:href|javascript:)"#)
            .expect("narrative attribute regex must compile")
    })
}

/// Narrative status plus its limited XHTML `div`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NarrativeWire", into = "NarrativeWire")]
pub struct Narrative {
    status: NarrativeStatus,
    div: String,
}

impl Narrative {
    /// Build a narrative after checking that the `div` is inert XHTML.
    pub fn new(status: NarrativeStatus, div: impl Into<String>) -> Result<Self, FieldError> {
        let div = div.into();
        let trimmed = div.trim();
        if trimmed.is_empty() {
            return Err(FieldError::UnsafeNarrative("div must not be empty".into()));
        }
        if !trimmed.starts_with("<div") {
            return Err(FieldError::UnsafeNarrative(
                "content must be a single <div> element".into(),
            ));
        }
        if let Some(found) = forbidden_element_regex().captures(trimmed) {
            return Err(FieldError::UnsafeNarrative(format!(
                "<{}> elements are not allowed",
                found[1].to_ascii_lowercase()
            )));
        }
        if let Some(found) = active_attribute_regex().captures(trimmed) {
            return Err(FieldError::UnsafeNarrative(format!(
                "active content '{}' is not allowed",
                found[1].trim()
            )));
        }
        Ok(Self { status, div })
    }

    pub fn status(&self) -> NarrativeStatus {
        self.status
    }

    pub fn div(&self) -> &str {
        &self.div
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NarrativeWire {
    status: NarrativeStatus,
    div: String,
}

impl TryFrom<NarrativeWire> for Narrative {
    type Error = FieldError;

    fn try_from(wire: NarrativeWire) -> Result<Self, Self::Error> {
        Narrative::new(wire.status, wire.div)
    }
}

impl From<Narrative> for NarrativeWire {
    fn from(narrative: Narrative) -> Self {
        NarrativeWire {
            status: narrative.status,
            div: narrative.div,
        }
    }
}
