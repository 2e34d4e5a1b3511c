//! Account and login handlers.
//!
//! # Endpoints
//!
//! ```text
//! POST /api/auth/login                            - Login, returns a bearer token
//! POST /api/account/create_account                - Register
//! GET  /api/account/confirm-email?userId=&code=   - Confirm email, redirects
//! POST /api/account/password_recovery_s1          - Mail a reset link
//! PUT  /api/account/password_recovery_s2          - Reset password with the mailed code
//! PUT  /api/account/change_password/{email}       - Change password (User policy)
//! GET  /api/account/admin                         - Capability check (Admin policy)
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8080/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "alice@example.com", "password": "Secret1"}'
//! ```

use super::{
    AppState,
    extract::JsonBody,
    middleware::AuthenticatedUser,
    response::{ApiError, ApiResponse, ApiResult},
};
use crate::{logging::log_security_event, metrics};
use admission::auth::{
    AuthError, ChangePasswordRequest, LoginRequest, PasswordResetConfirm, RegisterRequest, UserId,
};
use admission::validation::normalize_email;
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default, alias = "userName", alias = "username")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: UserId,
    pub email: String,
    pub auth_token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    #[serde(alias = "firstName")]
    pub first_name: String,
    #[serde(alias = "lastName")]
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfirmEmailQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailPayload {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecoverPasswordPayload {
    pub email: String,
    pub code: String,
    #[serde(alias = "new_password")]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordPayload {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "new_password")]
    pub password: String,
}

/// Authenticate and issue an access token
///
/// # Response
///
/// On success, returns `200 OK`:
/// ```json
/// {
///   "id": "0b6c5c1e-...",
///   "email": "alice@example.com",
///   "auth_token": "eyJhbGciOiJIUzI1NiIs...",
///   "expires_in": 7200
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `429 Too Many Requests`: Too many attempts for this email
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(&payload.email);
    check_rate_limit(&state, "login", &email).await?;

    let request = LoginRequest {
        email: email.clone(),
        password: payload.password,
    };

    match state.auth_manager.login(request).await {
        Ok((user, token)) => {
            metrics::login_attempts_total(true);
            tracing::info!(user_id = %user.id, "Login succeeded");
            Ok(Json(LoginResponse {
                id: user.id,
                email: user.email,
                auth_token: token.auth_token,
                expires_in: token.expires_in,
            }))
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            if matches!(e, AuthError::InvalidCredentials | AuthError::EmailNotConfirmed) {
                log_security_event("failed_login", Some(&email), None, &e.to_string());
            }
            Err(e.into())
        }
    }
}

/// Register a new account and mail its confirmation link
///
/// # Errors
///
/// - `400 Bad Request`: Field-level validation failures in `model_state`
/// - `409 Conflict`: Email already registered
pub async fn create_account(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterPayload>,
) -> ApiResult<Json<ApiResponse>> {
    let request = RegisterRequest {
        email: payload.email,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };

    state.auth_manager.register(request).await?;
    metrics::registrations_total();

    Ok(Json(ApiResponse::ok("Account created")))
}

/// Confirm an email address and redirect to the post-confirmation page
///
/// # Errors
///
/// - `400 Bad Request`: Missing parameters, unknown user, or an invalid,
///   expired or already consumed code
pub async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<ConfirmEmailQuery>,
) -> ApiResult<Redirect> {
    match state
        .auth_manager
        .confirm_email(&query.user_id, &query.code)
        .await
    {
        Ok(_) => Ok(Redirect::to(&state.post_confirmation_url)),
        Err(e) => {
            if matches!(e, AuthError::InvalidCode) {
                log_security_event("invalid_code", Some(&query.user_id), None, "Email confirmation rejected");
            }
            Err(ApiError::from_auth(e, StatusCode::BAD_REQUEST))
        }
    }
}

/// Start password recovery
///
/// # Errors
///
/// - `400 Bad Request`: Malformed email
/// - `404 Not Found`: Unknown email (unless masking is configured)
/// - `429 Too Many Requests`: Too many recovery requests for this email
pub async fn password_recovery_initiate(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EmailPayload>,
) -> ApiResult<Json<ApiResponse>> {
    let email = normalize_email(&payload.email);
    check_rate_limit(&state, "password_recovery_s1", &email).await?;

    state
        .auth_manager
        .initiate_password_recovery(&email)
        .await
        .map_err(|e| ApiError::from_auth(e, StatusCode::NOT_FOUND))?;

    Ok(Json(ApiResponse::ok("Password reset link sent")))
}

/// Finish password recovery with the mailed code
///
/// # Errors
///
/// - `400 Bad Request`: Unknown email, invalid or spent code, or a new
///   password failing the policy
pub async fn password_recovery_complete(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RecoverPasswordPayload>,
) -> ApiResult<Json<ApiResponse>> {
    let request = PasswordResetConfirm {
        email: payload.email,
        code: payload.code,
        new_password: payload.password,
    };

    state
        .auth_manager
        .complete_password_recovery(request)
        .await
        .map_err(|e| ApiError::from_auth(e, StatusCode::BAD_REQUEST))?;

    Ok(Json(ApiResponse::ok("Password successfully reset.")))
}

/// Change the caller's password
///
/// The `{email}` segment must name the authenticated account.
///
/// # Errors
///
/// - `400 Bad Request`: New password fails the policy
/// - `401 Unauthorized`: Current password does not match
/// - `403 Forbidden`: `{email}` is not the caller
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(email): Path<String>,
    JsonBody(payload): JsonBody<ChangePasswordPayload>,
) -> ApiResult<Json<ApiResponse>> {
    if normalize_email(&email) != normalize_email(user.email()) {
        log_security_event(
            "password_change_denied",
            Some(user.email()),
            None,
            "Attempted to change another account's password",
        );
        return Err(ApiError::forbidden());
    }

    let request = ChangePasswordRequest {
        current_password: payload.current_password,
        new_password: payload.password,
    };

    if let Err(e) = state.auth_manager.change_password(&email, request).await {
        if matches!(e, AuthError::InvalidCredentials) {
            log_security_event("password_change_failed", Some(user.email()), None, "Current password mismatch");
        }
        return Err(e.into());
    }

    Ok(Json(ApiResponse::ok("Password successfully changed.")))
}

/// Capability check: `200` with no body for administrators
///
/// Non-administrators never reach this handler; the policy gate answers 403.
pub async fn admin_check() -> impl IntoResponse {
    (StatusCode::OK, [(header::CACHE_CONTROL, "no-store, no-cache")])
}

async fn check_rate_limit(state: &AppState, endpoint: &str, subject: &str) -> ApiResult<()> {
    if let Err(retry_after) = state.rate_limiter.check(endpoint, subject).await {
        metrics::rate_limit_hits_total(endpoint);
        log_security_event(
            "rate_limited",
            Some(subject),
            None,
            &format!("{endpoint} limited, retry in {}s", retry_after.as_secs()),
        );
        return Err(AuthError::RateLimited.into());
    }
    Ok(())
}
