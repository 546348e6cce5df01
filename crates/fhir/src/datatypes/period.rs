use crate::fields::{Id, Instant};
use crate::validation::{field_path, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};

/// A time period defined by a start and end date/time.
///
/// An open end means the period is ongoing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Id>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Instant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Instant>,
}

impl Period {
    pub fn new(start: Option<Instant>, end: Option<Instant>) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    /// True if `at` falls inside the period (bounds inclusive, open ends unbounded).
    pub fn contains(&self, at: Instant) -> bool {
        self.start.map_or(true, |start| start <= at) && self.end.map_or(true, |end| at <= end)
    }
}

impl Validate for Period {
    fn validate_at(&self, path: &str, errors: &mut ValidationErrors) {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                errors.push(
                    field_path(path, "end"),
                    format!("end ({end}) must not be before start ({start})"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Instant {
        Instant::parse(s).unwrap()
    }

    #[test]
    fn end_before_start_is_rejected() {
        let period = Period::new(
            Some(at("2024-05-01T00:00:00Z")),
            Some(at("2024-04-30T23:59:59Z")),
        );
        let errors = period.validate().unwrap_err();
        assert!(errors.has_field("end"));
    }

    #[test]
    fn open_or_equal_bounds_are_fine() {
        let t = at("2024-05-01T00:00:00Z");
        assert!(Period::new(Some(t), Some(t)).validate().is_ok());
        assert!(Period::new(Some(t), None).validate().is_ok());
        assert!(Period::new(None, Some(t)).validate().is_ok());
    }

    #[test]
    fn contains_respects_open_ends() {
        let period = Period::new(Some(at("2024-01-01T00:00:00Z")), None);
        assert!(period.contains(at("2030-01-01T00:00:00Z")));
        assert!(!period.contains(at("2023-12-31T23:59:59Z")));
    }
}
