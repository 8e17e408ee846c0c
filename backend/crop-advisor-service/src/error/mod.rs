/// Error types for Crop Advisor Service
///
/// Artifact and inference failures on the crop path are recovered inside the
/// predictor and only surface in logs. Soil classification and request
/// validation errors are converted to HTTP responses.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Artifact not found: {0}")]
    ArtifactMissing(String),

    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Incompatible shape: expected {expected}, got {actual}")]
    IncompatibleShape { expected: usize, actual: usize },

    #[error("Model inference failed: {0}")]
    InferenceError(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Candidate pool exhausted: needed {needed} labels, {available} available")]
    CandidatePoolExhausted { needed: usize, available: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PredictionError>;

/// JSON body returned for every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
}

impl PredictionError {
    fn error_type_and_code(&self) -> (&'static str, &'static str) {
        match self {
            PredictionError::InvalidImage(_) => ("validation_error", "INVALID_IMAGE"),
            PredictionError::InvalidInput(_) => ("validation_error", "INVALID_REQUEST"),
            PredictionError::ModelUnavailable(_) => ("server_error", "MODEL_UNAVAILABLE"),
            PredictionError::ArtifactMissing(_) | PredictionError::ArtifactCorrupt(_) => {
                ("server_error", "ARTIFACT_ERROR")
            }
            PredictionError::IncompatibleShape { .. } | PredictionError::InferenceError(_) => {
                ("server_error", "INFERENCE_ERROR")
            }
            PredictionError::CandidatePoolExhausted { .. } | PredictionError::Io(_) => {
                ("server_error", "INTERNAL_SERVER_ERROR")
            }
        }
    }
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::InvalidImage(_) | PredictionError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictionError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!("Request failed: {}", self),
            StatusCode::SERVICE_UNAVAILABLE => tracing::warn!("Request failed: {}", self),
            _ => tracing::debug!("Request rejected: {}", self),
        }

        let (error_type, code) = self.error_type_and_code();
        let response = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.to_string(),
            status: status.as_u16(),
            error_type: error_type.to_string(),
            code: code.to_string(),
        };

        HttpResponse::build(status).json(response)
    }
}

impl From<validator::ValidationErrors> for PredictionError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PredictionError::InvalidInput(errors.to_string())
    }
}
