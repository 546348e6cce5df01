use crate::fields::{Id, Instant, Uri};
use serde::{Deserialize, Serialize};

/// Metadata every resource carries.
///
/// `versionId`, `created` and `lastUpdated` are maintained by the store: `created` is set
/// once and never edited, `lastUpdated` is refreshed on every write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<Id>,

    /// Not part of FHIR; kept for auditing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Instant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Instant>,

    /// Profiles this resource claims to conform to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Uri>,

    /// Security label: id of a stored Coding record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Id>,
}

impl Meta {
    /// Version that follows the current one: `n + 1` for numeric versions, otherwise `1`.
    pub fn next_version(&self) -> Id {
        let next = self
            .version_id
            .as_ref()
            .and_then(|v| v.as_str().parse::<u64>().ok())
            .map_or(1, |n| n.saturating_add(1));
        Id::new(&next.to_string()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_version_increments_numbers() {
        let mut meta = Meta::default();
        assert_eq!(meta.next_version().as_str(), "1");
        meta.version_id = Some(Id::new("41").unwrap());
        assert_eq!(meta.next_version().as_str(), "42");
        meta.version_id = Some(Id::new("abc").unwrap());
        assert_eq!(meta.next_version().as_str(), "1");
    }
}
