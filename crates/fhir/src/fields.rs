//! FHIR primitive field types.
//!
//! Each type wraps a plain string, timestamp or byte payload and adds the constraint FHIR
//! places on it: a maximum length, a character class, or a format pattern.
//! See <http://build.fhir.org/datatypes.html>.
//!
//! Every constructor validates, and every `Deserialize` impl goes through the same
//! constructor, so a parsed record never holds an out-of-range primitive.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use medux_types::{BoundedText, TextError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Validation failure for a single primitive value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    Text(#[from] TextError),

    #[error("Enter a valid URI (no whitespace, at least one character)")]
    InvalidUri,

    #[error("Given string is no OID")]
    InvalidOid,

    #[error("Enter a valid code: {0}")]
    InvalidCode(&'static str),

    #[error("Enter a valid id: {0}")]
    InvalidId(&'static str),

    #[error("Enter a valid instant: {0}")]
    InvalidInstant(String),

    #[error("Invalid base64 data: {0}")]
    InvalidBase64(String),

    #[error("Decoded base64 data is not UTF-8 text")]
    NotUtf8,

    #[error("Select a valid choice. '{value}' is not one of: {allowed}")]
    InvalidChoice { value: String, allowed: String },

    #[error("Unsafe narrative: {0}")]
    UnsafeNarrative(String),
}

fn oid_regex() -> &'static Regex {
    static OID_RE: OnceLock<Regex> = OnceLock::new();
    OID_RE.get_or_init(|| {
        Regex::new(r"^(?:urn:oid:)?[0-2](?:\.[1-9]\d*)+$").expect("OID regex must compile")
    })
}

fn code_regex() -> &'static Regex {
    static CODE_RE: OnceLock<Regex> = OnceLock::new();
    CODE_RE.get_or_init(|| Regex::new(r"^\S+( \S+)*$").expect("code regex must compile"))
}

fn id_regex() -> &'static Regex {
    static ID_RE: OnceLock<Regex> = OnceLock::new();
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9\-.]+$").expect("id regex must compile"))
}

/// Implements `Display`, `AsRef<str>`, `FromStr` and string-shaped serde for a validated
/// newtype with a `new(&str) -> Result<Self, FieldError>` constructor and `as_str()`.
macro_rules! string_field {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl FromStr for $name {
            type Err = FieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ============================================================================
// uri / oid
// ============================================================================

/// A Uniform Resource Identifier Reference (RFC 3986).
///
/// URIs are case sensitive. For UUIDs use all lowercase letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(BoundedText<255>);

impl Uri {
    pub const MAX_LENGTH: usize = 255;

    pub fn new(value: &str) -> Result<Self, FieldError> {
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(FieldError::InvalidUri);
        }
        Ok(Self(BoundedText::new(value)?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True for absolute URLs and URNs, which never point into the local store.
    pub fn is_absolute(&self) -> bool {
        let s = self.as_str();
        s.contains("://") || s.starts_with("urn:")
    }
}

string_field!(Uri);

/// An OID represented as a URI, e.g. `1.2.840.10008` or `urn:oid:1.2.840.10008`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Uri);

impl Oid {
    pub fn new(value: &str) -> Result<Self, FieldError> {
        let uri = Uri::new(value)?;
        if !oid_regex().is_match(uri.as_str()) {
            return Err(FieldError::InvalidOid);
        }
        Ok(Self(uri))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The dotted numeric part without any `urn:oid:` prefix.
    pub fn dotted(&self) -> &str {
        self.as_str()
            .strip_prefix("urn:oid:")
            .unwrap_or_else(|| self.as_str())
    }

    pub fn as_uri(&self) -> &Uri {
        &self.0
    }
}

string_field!(Oid);

// ============================================================================
// code
// ============================================================================

/// A value taken from a set of controlled strings defined elsewhere.
///
/// At least one character, no leading or trailing whitespace, and no whitespace other
/// than single spaces in the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(BoundedText<64>);

impl Code {
    pub const MAX_LENGTH: usize = 64;

    pub fn new(value: &str) -> Result<Self, FieldError> {
        if value.is_empty() {
            return Err(FieldError::InvalidCode("must not be empty"));
        }
        let text = BoundedText::new(value)?;
        if !code_regex().is_match(value) {
            return Err(FieldError::InvalidCode(
                "no leading, trailing or repeated whitespace",
            ));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

string_field!(Code);

// ============================================================================
// id
// ============================================================================

/// The logical id of a record.
///
/// Any combination of ASCII letters, numerals, `-` and `.`, with a length limit of 64
/// characters. This might be an integer, an un-prefixed OID, a UUID or any other
/// identifier pattern that meets these constraints.
///
/// `Id::default()` generates a fresh UUID on every call, which is also what serde uses
/// for an omitted `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    pub const MAX_LENGTH: usize = 64;

    pub fn new(value: &str) -> Result<Self, FieldError> {
        if value.is_empty() {
            return Err(FieldError::InvalidId("must not be empty"));
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(FieldError::Text(TextError::TooLong {
                max: Self::MAX_LENGTH,
                actual: value.chars().count(),
            }));
        }
        if !id_regex().is_match(value) {
            return Err(FieldError::InvalidId(
                "only ASCII letters, digits, '-' and '.' are allowed",
            ));
        }
        Ok(Self(value.to_owned()))
    }

    /// A fresh random id (lowercase hyphenated UUIDv4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::generate()
    }
}

string_field!(Id);

// ============================================================================
// instant
// ============================================================================

/// An instant in time, known at least to the second and always with a time zone.
///
/// This type is for system times, not human times. Values are normalised to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn parse(value: &str) -> Result<Self, FieldError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| FieldError::InvalidInstant(format!("{value}: {e}")))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Serialize for Instant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Instant::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// markdown
// ============================================================================

/// A string that may contain markdown syntax, for optional processing by a markdown
/// presentation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markdown(String);

impl Markdown {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// base64
// ============================================================================

/// A stream of bytes, base64 encoded.
///
/// The held string is the storage representation and is always valid base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Text(String);

impl Base64Text {
    /// Wrap an already encoded value after checking that it decodes.
    pub fn new(encoded: &str) -> Result<Self, FieldError> {
        BASE64
            .decode(encoded)
            .map_err(|e| FieldError::InvalidBase64(e.to_string()))?;
        Ok(Self(encoded.to_owned()))
    }

    /// Encode raw bytes into their storage form.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Encode UTF-8 text into its storage form.
    pub fn encode(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Decode a stored value into text.
    ///
    /// An absent stored value stays absent.
    pub fn from_db_value(value: Option<&str>) -> Result<Option<String>, FieldError> {
        value.map(|v| Self::new(v)?.decode_text()).transpose()
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, FieldError> {
        BASE64
            .decode(&self.0)
            .map_err(|e| FieldError::InvalidBase64(e.to_string()))
    }

    pub fn decode_text(&self) -> Result<String, FieldError> {
        String::from_utf8(self.decode_bytes()?).map_err(|_| FieldError::NotUtf8)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_field!(Base64Text);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_accepts_dotted_numbers() {
        for ok in ["1.2.840.10008", "2.16.840.1.113883", "0.4", "urn:oid:1.2.3"] {
            assert!(Oid::new(ok).is_ok(), "{ok} should be an OID");
        }
    }

    #[test]
    fn oid_rejects_everything_else() {
        for bad in ["3.1", "1", "1.02", "1.2.", "a1.2.3", "1.2.3x", "http://x/1.2", ""] {
            assert!(Oid::new(bad).is_err(), "{bad} should be rejected");
        }
        assert_eq!(Oid::new("1.0").unwrap_err().to_string(), "Given string is no OID");
    }

    #[test]
    fn oid_dotted_strips_urn_prefix() {
        assert_eq!(Oid::new("urn:oid:1.2.3").unwrap().dotted(), "1.2.3");
        assert_eq!(Oid::new("1.2.3").unwrap().dotted(), "1.2.3");
    }

    #[test]
    fn uri_enforces_length_and_whitespace() {
        assert!(Uri::new("http://hl7.org/fhir/sid/us-ssn").is_ok());
        assert!(Uri::new("has space").is_err());
        assert!(Uri::new("").is_err());

        let long = format!("http://example.org/{}", "a".repeat(255));
        assert!(matches!(
            Uri::new(&long),
            Err(FieldError::Text(TextError::TooLong { max: 255, .. }))
        ));
    }

    #[test]
    fn code_rejects_irregular_whitespace() {
        assert!(Code::new("final").is_ok());
        assert!(Code::new("two words").is_ok());
        assert!(Code::new(" lead").is_err());
        assert!(Code::new("trail ").is_err());
        assert!(Code::new("double  space").is_err());
        assert!(Code::new("tab\there").is_err());
        assert!(Code::new("").is_err());
        assert!(Code::new(&"c".repeat(65)).is_err());
    }

    #[test]
    fn id_enforces_charset_and_length() {
        assert!(Id::new("patient-1.a").is_ok());
        assert!(Id::new(&"a".repeat(64)).is_ok());
        assert!(Id::new(&"a".repeat(65)).is_err());
        assert!(Id::new("under_score").is_err());
        assert!(Id::new("").is_err());
    }

    #[test]
    fn id_default_is_fresh_and_valid() {
        let a = Id::default();
        let b = Id::default();
        assert_ne!(a, b);
        assert!(a.as_str().len() <= Id::MAX_LENGTH);
        assert!(Id::new(a.as_str()).is_ok());
    }

    #[test]
    fn instant_requires_offset_and_normalises_to_utc() {
        let instant = Instant::parse("2026-01-23T14:58:04+01:00").unwrap();
        assert_eq!(instant.to_string(), "2026-01-23T13:58:04Z");
        assert!(Instant::parse("2026-01-23T13:58:04").is_err());
        assert!(Instant::parse("2026-01-23").is_err());
    }

    #[test]
    fn base64_decodes_stored_text() {
        let stored = Base64Text::encode("Hello, Welt").as_str().to_owned();
        assert_eq!(
            Base64Text::from_db_value(Some(&stored)).unwrap().as_deref(),
            Some("Hello, Welt")
        );
        assert_eq!(Base64Text::from_db_value(None).unwrap(), None);
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(matches!(
            Base64Text::from_db_value(Some("***")),
            Err(FieldError::InvalidBase64(_))
        ));
        let not_text = Base64Text::from_bytes(&[0xff, 0xfe]);
        assert_eq!(not_text.decode_text().unwrap_err(), FieldError::NotUtf8);
    }

    #[test]
    fn fields_validate_when_deserialised() {
        let err = serde_json::from_str::<Oid>("\"1.2.x\"").unwrap_err();
        assert!(err.to_string().contains("no OID"));
        let id: Id = serde_json::from_str("\"abc-1\"").unwrap();
        assert_eq!(id.as_str(), "abc-1");
    }
}
