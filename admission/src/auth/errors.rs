//! Authentication error types.

use crate::ValidationErrors;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Email/password pair did not match a stored identity
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Login refused because the email was never confirmed
    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Email already registered
    #[error("Email already registered")]
    EmailTaken,

    /// Malformed or missing input
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Confirmation or reset code is unknown, expired or already consumed
    #[error("Invalid or expired code")]
    InvalidCode,

    /// Token was valid but the identity lacks the claim a policy requires
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Signing key or algorithm unavailable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rate limited
    #[error("Too many attempts, please try again later")]
    RateLimited,
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        AuthError::Validation(errors)
    }
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database, hashing and JWT errors are reduced to generic messages so no
    /// internal detail reaches the caller.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::HashingFailed | AuthError::Configuration(_) => {
                "Internal server error".to_string()
            }
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            AuthError::Validation(_) => "Validation failed".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this error is an unexpected internal failure rather than a
    /// caller mistake
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Database(_) | AuthError::HashingFailed | AuthError::Configuration(_)
        )
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_internals() {
        let err = AuthError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.is_internal());

        let err = AuthError::Configuration("JWT_SECRET missing".to_string());
        assert!(!err.client_message().contains("JWT_SECRET"));
    }

    #[test]
    fn test_client_message_keeps_caller_errors() {
        assert_eq!(
            AuthError::InvalidCredentials.client_message(),
            "Invalid email or password"
        );
        assert_eq!(AuthError::InvalidCode.client_message(), "Invalid or expired code");
        assert!(!AuthError::EmailTaken.is_internal());
    }
}
