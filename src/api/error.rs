use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use tracing::{error, warn};

use crate::api::validation::ErrorResponse;
use crate::artifact::ArtifactError;
use crate::generator::GenerateError;

/// Service-level errors
#[derive(Debug)]
pub enum ServiceError {
    /// No job under this id (or the id is not a job id at all)
    JobNotFound(String),

    /// Requested artifact does not exist
    FileNotFound(String),

    /// Request passed deserialization but makes no sense
    ValidationError(String),

    /// Language-model call failed
    GenerationError(GenerateError),

    /// Deck could not be rendered or stored
    ArtifactError(ArtifactError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::JobNotFound(id) => write!(f, "Job not found: {}", id),
            ServiceError::FileNotFound(name) => write!(f, "File not found: {}", name),
            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::GenerationError(e) => write!(f, "{}", e),
            ServiceError::ArtifactError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<GenerateError> for ServiceError {
    fn from(err: GenerateError) -> Self {
        ServiceError::GenerationError(err)
    }
}

impl From<ArtifactError> for ServiceError {
    fn from(err: ArtifactError) -> Self {
        ServiceError::ArtifactError(err)
    }
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::JobNotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::NotFound().json(ErrorResponse::new("Job not found"))
            }
            ServiceError::FileNotFound(name) => {
                warn!("File not found: {}", name);
                HttpResponse::NotFound().json(ErrorResponse::new("File not found"))
            }
            ServiceError::ValidationError(msg) => {
                warn!("Validation error: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse::new(msg.clone()))
            }
            ServiceError::GenerationError(e) => {
                error!("Generation error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
            }
            ServiceError::ArtifactError(e) => {
                error!("Artifact error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
            }
        }
    }
}
