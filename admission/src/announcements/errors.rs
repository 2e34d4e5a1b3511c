//! Announcement error types.

use crate::ValidationErrors;
use thiserror::Error;
use uuid::Uuid;

/// Announcement errors
#[derive(Debug, Error)]
pub enum AnnouncementError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Announcement not found
    #[error("Announcement not found: {0}")]
    NotFound(Uuid),

    /// Malformed or missing input
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
}

impl From<ValidationErrors> for AnnouncementError {
    fn from(errors: ValidationErrors) -> Self {
        AnnouncementError::Validation(errors)
    }
}

/// Result type for announcement operations
pub type AnnouncementResult<T> = Result<T, AnnouncementError>;
