//! Constants used throughout the MedUX core crate.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "medux_data";

/// Default namespace; local absolute references look like `https://{namespace}/fhir/Type/id`.
pub const DEFAULT_NAMESPACE: &str = "medux.local";

/// File extension of stored records.
pub const RECORD_EXTENSION: &str = "yaml";

/// Suffix of the temporary file a record is written to before it is renamed into place.
pub const TEMP_SUFFIX: &str = ".tmp";
