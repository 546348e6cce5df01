//! Mapping of core errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medux_core::CoreError;
use serde::Serialize;
use utoipa::ToSchema;

/// One failed field rule.
#[derive(Serialize, ToSchema)]
pub struct FieldErrorRes {
    pub field: String,
    pub message: String,
}

/// Error body returned by every failing endpoint.
#[derive(Serialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldErrorRes>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::InvalidInput(_)
                | CoreError::Validation(_)
                | CoreError::DanglingLink { .. }
                | CoreError::Fhir(_) => StatusCode::BAD_REQUEST,
                CoreError::UnknownModel(_) | CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Duplicate(_)
                | CoreError::UniqueViolation { .. }
                | CoreError::Protected { .. }
                | CoreError::DetachInvalid { .. }
                | CoreError::VersionConflict { .. } => StatusCode::CONFLICT,
                CoreError::Corrupt { .. }
                | CoreError::Encode(_)
                | CoreError::StorageDirCreation(_)
                | CoreError::FileWrite(_)
                | CoreError::FileRead(_)
                | CoreError::FileDelete(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorRes {
        match self {
            ApiError::Unauthorized(msg) => ErrorRes {
                error: (*msg).to_owned(),
                fields: Vec::new(),
            },
            ApiError::BadRequest(msg) => ErrorRes {
                error: msg.clone(),
                fields: Vec::new(),
            },
            ApiError::Core(CoreError::Validation(errors)) => ErrorRes {
                error: "validation failed".into(),
                fields: errors
                    .iter()
                    .map(|issue| FieldErrorRes {
                        field: issue.field.clone(),
                        message: issue.message.clone(),
                    })
                    .collect(),
            },
            ApiError::Core(err) if self.status_code().is_server_error() => {
                tracing::error!("storage error: {:?}", err);
                ErrorRes {
                    error: "Internal error".into(),
                    fields: Vec::new(),
                }
            }
            ApiError::Core(err) => ErrorRes {
                error: err.to_string(),
                fields: Vec::new(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}
