//! HTTP API client for the admission server.

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures a caller is expected to handle
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Server rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Failed to persist session: {0}")]
    Storage(anyhow::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Body of a successful login, decoded once at the response boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: String,
    pub email: String,
    pub auth_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub admin_id: String,
    pub publish_date: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    password: &'a str,
}

/// Failure envelope returned by the server
#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    model_state: Option<serde_json::Value>,
}

/// API client for communicating with the admission server
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Login with email and password
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Register a new account; the server mails a confirmation link
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url("/api/account/create_account"))
            .json(&RegisterRequest {
                email,
                password,
                first_name,
                last_name,
            })
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Call the admin-only endpoint
    ///
    /// Answers with the HTTP status instead of an error, since `403` is an
    /// expected outcome for ordinary accounts.
    pub async fn admin_check(&self, token: Option<&str>) -> ClientResult<StatusCode> {
        let request = with_token(self.client.get(self.url("/api/account/admin")), token);
        Ok(request.send().await?.status())
    }

    pub async fn change_password(
        &self,
        token: &str,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> ClientResult<()> {
        let response = self
            .client
            .put(self.change_password_url(email)?)
            .bearer_auth(token)
            .json(&ChangePasswordRequest {
                current_password,
                password: new_password,
            })
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Ask the server to mail a password reset link
    pub async fn password_recovery_initiate(&self, email: &str) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url("/api/account/password_recovery_s1"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    pub async fn password_recovery_complete(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ClientResult<()> {
        let response = self
            .client
            .put(self.url("/api/account/password_recovery_s2"))
            .json(&serde_json::json!({ "email": email, "code": code, "password": new_password }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    pub async fn list_announcements(&self, token: &str) -> ClientResult<Vec<Announcement>> {
        let response = self
            .client
            .get(self.url("/api/announcements"))
            .bearer_auth(token)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The email travels as one percent-encoded path segment
    fn change_password_url(&self, email: &str) -> ClientResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "account", "change_password", email]);
        Ok(url)
    }
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Map failure statuses to [`ClientError`], passing successes through
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ClientError::InvalidCredentials),
        StatusCode::FORBIDDEN => Err(ClientError::Forbidden),
        StatusCode::TOO_MANY_REQUESTS => Err(ClientError::RateLimited),
        _ => {
            let body: FailureBody = response.json().await.unwrap_or_default();
            let message = match (body.message, body.model_state) {
                (Some(message), _) => message,
                (None, Some(model_state)) => model_state.to_string(),
                (None, None) => status.canonical_reason().unwrap_or("unknown").to_string(),
            };
            Err(ClientError::Rejected { status, message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/api/auth/login"), "http://localhost:8080/api/auth/login");
    }

    #[test]
    fn test_change_password_url_encodes_email() {
        let client = ApiClient::new("http://localhost:8080/");
        let url = client.change_password_url("a#b?c%d/e@example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/account/change_password/a%23b%3Fc%25d%2Fe@example.com"
        );
        assert_eq!(url.path_segments().unwrap().count(), 4);

        let plain = client.change_password_url("alice@example.com").unwrap();
        assert_eq!(
            plain.as_str(),
            "http://localhost:8080/api/account/change_password/alice@example.com"
        );
    }

    #[test]
    fn test_login_response_decodes_server_body() {
        let body = r#"{"id":"0b6c5c1e-1f7a-4f7e-9d55-2a1d7c1b0c11","email":"alice@example.com","auth_token":"abc.def.ghi","expires_in":7200}"#;
        let response: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.email, "alice@example.com");
        assert_eq!(response.auth_token, "abc.def.ghi");
        assert_eq!(response.expires_in, 7200);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let result = client.login("alice@example.com", "Secret1").await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
