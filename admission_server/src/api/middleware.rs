//! Claim-based authorization middleware for protected endpoints.
//!
//! Each protected route is wrapped with a [`PolicyGate`] naming the policy it
//! requires. The gate extracts the bearer token from the `Authorization`
//! header, verifies it and evaluates the policy against its claims. Every
//! failure on the way answers `403 Forbidden`:
//!
//! ```text
//! NoToken ──► 403
//! TokenPresent ──► Invalid (malformed, bad signature, expired,
//!                           issuer/audience mismatch) ──► 403
//!              └─► Valid ──► PolicyDenied ──► 403
//!                        └─► PolicySatisfied ──► handler
//! ```
//!
//! On success the decoded claims are injected into request extensions as an
//! [`AuthenticatedUser`]:
//!
//! ```rust,no_run
//! use admission_server::api::middleware::AuthenticatedUser;
//! use axum::extract::Extension;
//!
//! async fn protected_handler(Extension(user): Extension<AuthenticatedUser>) -> String {
//!     format!("Authenticated as {}", user.email())
//! }
//! # let _ = protected_handler;
//! ```

use super::{request_id::RequestId, response::ApiError};
use crate::{logging::log_security_event, metrics};
use admission::auth::{AccessTokenClaims, AuthManager, Policy};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Middleware state for one protected route
#[derive(Clone)]
pub struct PolicyGate {
    pub auth_manager: Arc<AuthManager>,
    pub policy: Policy,
}

/// Verified token claims of the caller
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AccessTokenClaims);

impl AuthenticatedUser {
    /// Email the token was issued to
    pub fn email(&self) -> &str {
        &self.0.sub
    }

    pub fn claims(&self) -> &AccessTokenClaims {
        &self.0
    }
}

/// Extract a bearer token, tolerating any casing of the scheme
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Authorization middleware enforcing the gate's policy
pub async fn authorize(State(gate): State<PolicyGate>, mut request: Request, next: Next) -> Response {
    let policy = gate.policy;
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();

    let Some(token) = bearer_token(request.headers()) else {
        return deny(policy, &request_id, None, "Missing or malformed bearer token");
    };

    let claims = match gate.auth_manager.verify_access_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Token verification failed");
            return deny(policy, &request_id, None, "Invalid or expired token");
        }
    };

    if !policy.allows(&claims) {
        return deny(
            policy,
            &request_id,
            Some(&claims.sub),
            &format!("Token lacks claim required by policy {policy}"),
        );
    }

    request.extensions_mut().insert(AuthenticatedUser(claims));
    next.run(request).await
}

fn deny(policy: Policy, request_id: &str, user: Option<&str>, reason: &str) -> Response {
    metrics::policy_denials_total(policy.name());
    tracing::info!(request_id = %request_id, policy = %policy, "Request denied by policy gate");
    log_security_event("policy_denied", user, None, reason);
    ApiError::forbidden().into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers_with("bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_bearer_token_rejects_malformed() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
    }
}
