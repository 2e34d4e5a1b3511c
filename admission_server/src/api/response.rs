//! Response envelopes and error conversion.
//!
//! Every non-token response body is either an [`ApiResponse`] or an
//! [`ApiResponseObject`]. [`ApiError`] carries a status code plus a failed
//! envelope and is what handlers return on their error path.

use crate::logging::log_unexpected_error;
use admission::ValidationErrors;
use admission::announcements::AnnouncementError;
use admission::auth::AuthError;
use admission::candidates::CandidateError;
use admission::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Status envelope with optional message and field-level validation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_state: Option<ValidationErrors>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: Some(message.into()),
            model_state: None,
        }
    }

    /// `{ "status": true }`
    pub fn success() -> Self {
        Self {
            status: true,
            message: None,
            model_state: None,
        }
    }

    /// `{ "status": false }`
    pub fn failure() -> Self {
        Self {
            status: false,
            message: None,
            model_state: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: Some(message.into()),
            model_state: None,
        }
    }

    pub fn invalid(model_state: ValidationErrors) -> Self {
        Self {
            status: false,
            message: Some("Validation failed".to_string()),
            model_state: Some(model_state),
        }
    }
}

/// Status envelope wrapping a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponseObject<T> {
    pub status: bool,
    pub object: T,
}

impl<T> ApiResponseObject<T> {
    pub fn new(object: T) -> Self {
        Self {
            status: true,
            object,
        }
    }
}

/// Failed response: status code plus envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ApiResponse) -> Self {
        Self { status, body }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiResponse::failed(message))
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, ApiResponse::failed("Access denied"))
    }

    /// Map an auth failure, answering unknown identities with `not_found`
    ///
    /// Endpoints disagree on how an unknown identity is reported: the
    /// confirmation and reset flows answer 400, recovery initiation 404.
    pub fn from_auth(err: AuthError, not_found: StatusCode) -> Self {
        if matches!(err, AuthError::UserNotFound) {
            return Self::new(not_found, ApiResponse::failed(err.client_message()));
        }
        err.into()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::Validation(errors) => {
                return Self::new(StatusCode::BAD_REQUEST, ApiResponse::invalid(errors.clone()));
            }
            AuthError::InvalidCode => {
                return Self::new(
                    StatusCode::BAD_REQUEST,
                    ApiResponse::invalid(ValidationErrors::single("code", err.client_message())),
                );
            }
            AuthError::InvalidCredentials | AuthError::EmailNotConfirmed => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) | AuthError::JwtError(_) => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Database(_) | AuthError::HashingFailed | AuthError::Configuration(_) => {
                log_unexpected_error("account", &err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self::new(status, ApiResponse::failed(err.client_message()))
    }
}

impl From<AnnouncementError> for ApiError {
    fn from(err: AnnouncementError) -> Self {
        match err {
            AnnouncementError::Validation(errors) => {
                Self::new(StatusCode::BAD_REQUEST, ApiResponse::invalid(errors))
            }
            AnnouncementError::NotFound(id) => {
                tracing::debug!(announcement_id = %id, "Announcement not found");
                Self::new(StatusCode::BAD_REQUEST, ApiResponse::failure())
            }
            AnnouncementError::Database(ref e) => {
                log_unexpected_error("announcements", e);
                Self::new(StatusCode::BAD_REQUEST, ApiResponse::failure())
            }
        }
    }
}

impl From<CandidateError> for ApiError {
    fn from(err: CandidateError) -> Self {
        match err {
            CandidateError::Validation(errors) => {
                Self::new(StatusCode::BAD_REQUEST, ApiResponse::invalid(errors))
            }
            CandidateError::CandidateNotFound(_) | CandidateError::RepartitionNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, ApiResponse::failed(err.to_string()))
            }
            CandidateError::AlreadyAssigned(_) => {
                Self::new(StatusCode::CONFLICT, ApiResponse::failed(err.to_string()))
            }
            CandidateError::Database(ref e) => {
                log_unexpected_error("candidates", e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::failed("Internal server error"),
                )
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => Self::new(
                StatusCode::NOT_FOUND,
                ApiResponse::failed(format!("Blob not found: {name}")),
            ),
            StorageError::InvalidName(_) => Self::new(
                StatusCode::BAD_REQUEST,
                ApiResponse::invalid(ValidationErrors::single("name", "Invalid blob name")),
            ),
            StorageError::Io(ref e) => {
                log_unexpected_error("files", e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::failed("Internal server error"),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(ApiError::from(AuthError::InvalidCredentials).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::EmailTaken).status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from(AuthError::RateLimited).status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::from(AuthError::Forbidden("Admin".to_string())).status,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = ApiError::from(AuthError::HashingFailed);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.message.as_deref(), Some("Internal server error"));
        assert!(!err.body.status);
    }

    #[test]
    fn test_validation_carries_model_state() {
        let err = ApiError::from(AuthError::Validation(ValidationErrors::single("email", "bad")));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let state = err.body.model_state.unwrap();
        assert_eq!(state.field("email").unwrap(), ["bad".to_string()]);
    }

    #[test]
    fn test_not_found_status_per_endpoint() {
        let err = ApiError::from_auth(AuthError::UserNotFound, StatusCode::BAD_REQUEST);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = ApiError::from_auth(AuthError::UserNotFound, StatusCode::NOT_FOUND);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = ApiError::from_auth(AuthError::EmailTaken, StatusCode::BAD_REQUEST);
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_announcement_failures_are_bad_requests() {
        let err = ApiError::from(AnnouncementError::NotFound(uuid::Uuid::new_v4()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body, ApiResponse::failure());
    }

    #[test]
    fn test_candidate_error_status_mapping() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            ApiError::from(CandidateError::CandidateNotFound(id)).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::from(CandidateError::AlreadyAssigned(id)).status, StatusCode::CONFLICT);

        let err = ApiError::from(CandidateError::Validation(ValidationErrors::single("email", "bad")));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.body.model_state.is_some());
    }

    #[test]
    fn test_envelope_serialization() {
        let json = serde_json::to_value(ApiResponse::failure()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": false }));

        let json = serde_json::to_value(ApiResponseObject::new("x")).unwrap();
        assert_eq!(json, serde_json::json!({ "status": true, "object": "x" }));
    }
}
