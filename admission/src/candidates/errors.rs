//! Candidate and repartition error types.

use crate::ValidationErrors;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CandidateError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Candidate not found: {0}")]
    CandidateNotFound(Uuid),

    #[error("Repartition not found: {0}")]
    RepartitionNotFound(Uuid),

    /// The candidate already has a classroom assignment
    #[error("Candidate {0} already has a repartition")]
    AlreadyAssigned(Uuid),

    /// Malformed or missing input
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
}

impl From<ValidationErrors> for CandidateError {
    fn from(errors: ValidationErrors) -> Self {
        CandidateError::Validation(errors)
    }
}

/// Result type for candidate and repartition operations
pub type CandidateResult<T> = Result<T, CandidateError>;
