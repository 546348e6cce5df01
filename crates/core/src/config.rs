//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_NAMESPACE};
use crate::validation::validate_namespace_safe_for_uri;
use crate::{CoreError, CoreResult};
use medux_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    namespace: NonEmptyText,
    api_key: Option<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// An empty or whitespace-only `api_key` is treated as "no key configured".
    pub fn new(
        data_dir: PathBuf,
        namespace: NonEmptyText,
        api_key: Option<String>,
    ) -> CoreResult<Self> {
        validate_namespace_safe_for_uri(namespace.as_str())?;

        Ok(Self {
            data_dir,
            namespace,
            api_key: api_key
                .map(|k| k.trim().to_owned())
                .filter(|k| !k.is_empty()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Base URL under which absolute references count as local: `https://{namespace}/fhir`.
    pub fn base_url(&self) -> String {
        format!("https://{}/fhir", self.namespace)
    }
}

/// Resolve the data directory from an optional override, falling back to the default.
pub fn resolve_data_dir(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Parse the namespace from an optional string value, falling back to the default.
pub fn namespace_from_env_value(value: Option<String>) -> CoreResult<NonEmptyText> {
    let value = value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
    NonEmptyText::new(value).map_err(|e| CoreError::InvalidInput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_means_none() {
        let cfg = CoreConfig::new(
            PathBuf::from("data"),
            NonEmptyText::new("medux.test").unwrap(),
            Some("   ".into()),
        )
        .unwrap();
        assert_eq!(cfg.api_key(), None);
        assert_eq!(cfg.base_url(), "https://medux.test/fhir");
    }

    #[test]
    fn rejects_unsafe_namespace() {
        let err = CoreConfig::new(
            PathBuf::from("data"),
            NonEmptyText::new("bad namespace").unwrap(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        assert_eq!(resolve_data_dir(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(resolve_data_dir(Some(" /srv/medux ".into())), PathBuf::from("/srv/medux"));
        assert_eq!(
            namespace_from_env_value(Some(String::new())).unwrap().as_str(),
            DEFAULT_NAMESPACE
        );
    }
}
