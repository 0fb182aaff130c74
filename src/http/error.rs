use rouille::Response;
use thiserror::Error;

use crate::domain::validate::ValidationError;
use crate::storage::error::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TrackNotFound(id) => ApiError::NotFound(format!("Track not found: {id}")),

            StorageError::ArtifactNotFound(name) => {
                ApiError::NotFound(format!("File not found: {name}"))
            }

            StorageError::InvalidArtifactName(name) => {
                ApiError::BadRequest(format!("Invalid file name: {name}"))
            }

            StorageError::Fs(_) | StorageError::Internal(_) => {
                log::error!("Storage failure: {err}");
                ApiError::Internal("Internal server error".into())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Unprocessable(_) => 422,
            ApiError::MethodNotAllowed => 405,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        Response::json(&serde_json::json!({ "detail": self.to_string() })).with_status_code(status)
    }
}
