use fhir::{FhirError, ResourceKey, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("{0} not found")]
    NotFound(ResourceKey),
    #[error("{0} already exists")]
    Duplicate(ResourceKey),
    #[error("{model} with {key} already exists")]
    UniqueViolation { model: &'static str, key: String },
    #[error("cannot delete {target}: {referrer} refers to it through protected field {field}")]
    Protected {
        target: ResourceKey,
        referrer: ResourceKey,
        field: &'static str,
    },
    #[error("cannot delete {target}: detaching it would leave {referrer} invalid: {errors}")]
    DetachInvalid {
        target: ResourceKey,
        referrer: ResourceKey,
        errors: ValidationErrors,
    },
    #[error("{field} links to {target}, which does not exist")]
    DanglingLink {
        field: &'static str,
        target: ResourceKey,
    },
    #[error("{key} is at version {current}, not {given}")]
    VersionConflict {
        key: ResourceKey,
        current: String,
        given: String,
    },
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("FHIR error: {0}")]
    Fhir(FhirError),
    #[error("stored record {key} is unreadable: {source}")]
    Corrupt { key: ResourceKey, source: FhirError },
    #[error("failed to encode record: {0}")]
    Encode(FhirError),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete record file: {0}")]
    FileDelete(std::io::Error),
}

impl From<FhirError> for CoreError {
    fn from(err: FhirError) -> Self {
        match err {
            FhirError::Validation(errors) => CoreError::Validation(errors),
            other => CoreError::Fhir(other),
        }
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        CoreError::Validation(errors)
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
