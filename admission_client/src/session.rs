//! Client session lifecycle.
//!
//! A session is four persisted keys: the raw login response, the email, the
//! bearer token and the admin flag. Login writes the first three and then
//! checks the admin endpoint in the background; the flag stays unset, and
//! [`AdminStatus::Unknown`], until that check lands.
//!
//! Every login and logout bumps a generation counter under the same lock the
//! admin check takes before writing, so a check that started before a logout
//! (or a newer login) never writes into the session that replaced it.

use crate::api_client::{ApiClient, ClientError, ClientResult, LoginResponse};
use crate::store::SessionStore;
use anyhow::Result;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const USER_EMAIL_KEY: &str = "currUserMail";
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Holds the admin check's HTTP status code
pub const ADMIN_KEY: &str = "admin";

pub const SESSION_KEYS: [&str; 4] = [CURRENT_USER_KEY, USER_EMAIL_KEY, AUTH_TOKEN_KEY, ADMIN_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    /// No admin check result recorded for this session
    Unknown,
    Admin,
    NotAdmin,
}

impl AdminStatus {
    fn from_status(status: &str) -> Self {
        match status.parse::<u16>() {
            Ok(200) => Self::Admin,
            Ok(_) => Self::NotAdmin,
            Err(_) => Self::Unknown,
        }
    }
}

/// A completed login whose admin check may still be running
#[derive(Debug)]
pub struct PendingSession {
    pub response: LoginResponse,
    admin_check: JoinHandle<AdminStatus>,
}

impl PendingSession {
    /// Wait for the admin check
    ///
    /// Yields [`AdminStatus::Unknown`] when the check failed or the session
    /// was replaced before it finished.
    pub async fn admin_status(self) -> AdminStatus {
        self.admin_check.await.unwrap_or(AdminStatus::Unknown)
    }
}

pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn SessionStore>,
    generation: Arc<Mutex<u64>>,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in and persist the session
    ///
    /// A failed login leaves the stored session untouched. The admin check
    /// is best effort: its failure never undoes the login.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<PendingSession> {
        let response = self.api.login(email, password).await?;

        let generation = {
            let mut current = self.generation.lock().await;
            *current += 1;
            if let Err(e) = self.persist(&response) {
                // Never leave a half-written session behind
                self.clear();
                return Err(ClientError::Storage(e));
            }
            *current
        };

        let admin_check = tokio::spawn(check_admin(
            self.api.clone(),
            self.store.clone(),
            self.generation.clone(),
            generation,
            response.auth_token.clone(),
        ));

        Ok(PendingSession { response, admin_check })
    }

    /// Clear all four session keys
    ///
    /// Any admin check still in flight is ignored from here on.
    pub async fn logout(&self) -> Result<()> {
        let mut current = self.generation.lock().await;
        *current += 1;

        let mut result = Ok(());
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                result = Err(e);
            }
        }
        result
    }

    pub fn is_logged_in(&self) -> bool {
        self.store.get(AUTH_TOKEN_KEY).is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY)
    }

    pub fn email(&self) -> Option<String> {
        self.store.get(USER_EMAIL_KEY)
    }

    /// The stored login response
    pub fn current_user(&self) -> Option<LoginResponse> {
        self.store
            .get(CURRENT_USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn admin_status(&self) -> AdminStatus {
        self.store
            .get(ADMIN_KEY)
            .map_or(AdminStatus::Unknown, |status| AdminStatus::from_status(&status))
    }

    /// `Authorization` header value for the stored token
    pub fn authorization_header(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {token}"))
    }

    /// Attach the stored token to an outgoing request
    pub fn attach_token(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn persist(&self, response: &LoginResponse) -> Result<()> {
        self.store.set(CURRENT_USER_KEY, serde_json::to_string(response)?)?;
        self.store.set(USER_EMAIL_KEY, response.email.clone())?;
        self.store.set(AUTH_TOKEN_KEY, response.auth_token.clone())?;
        // The previous session's flag must not leak into this one
        self.store.remove(ADMIN_KEY)
    }

    fn clear(&self) {
        for key in SESSION_KEYS {
            let _ = self.store.remove(key);
        }
    }
}

async fn check_admin(
    api: ApiClient,
    store: Arc<dyn SessionStore>,
    generation: Arc<Mutex<u64>>,
    started_in: u64,
    token: String,
) -> AdminStatus {
    let status = match api.admin_check(Some(&token)).await {
        Ok(status) => status,
        Err(_) => return AdminStatus::Unknown,
    };

    let current = generation.lock().await;
    if *current != started_in {
        return AdminStatus::Unknown;
    }
    if store.set(ADMIN_KEY, status.as_u16().to_string()).is_err() {
        return AdminStatus::Unknown;
    }

    if status == StatusCode::OK {
        AdminStatus::Admin
    } else {
        AdminStatus::NotAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(ApiClient::new("http://127.0.0.1:9"), store.clone());
        (manager, store)
    }

    #[test]
    fn test_admin_status_from_status_code() {
        assert_eq!(AdminStatus::from_status("200"), AdminStatus::Admin);
        assert_eq!(AdminStatus::from_status("403"), AdminStatus::NotAdmin);
        assert_eq!(AdminStatus::from_status("garbage"), AdminStatus::Unknown);
    }

    #[tokio::test]
    async fn test_logout_clears_every_key() {
        let (manager, store) = manager();
        for key in SESSION_KEYS {
            store.set(key, "x".to_string()).unwrap();
        }
        assert!(manager.is_logged_in());

        manager.logout().await.unwrap();

        for key in SESSION_KEYS {
            assert_eq!(store.get(key), None, "{key} survived logout");
        }
        assert!(!manager.is_logged_in());
        assert_eq!(manager.admin_status(), AdminStatus::Unknown);
    }

    #[tokio::test]
    async fn test_logout_when_logged_out() {
        let (manager, _) = manager();
        manager.logout().await.unwrap();
        assert!(!manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_session() {
        let (manager, store) = manager();
        store.set(AUTH_TOKEN_KEY, "previous".to_string()).unwrap();

        assert!(manager.login("alice@example.com", "Secret1").await.is_err());
        assert_eq!(manager.token().as_deref(), Some("previous"));
    }

    #[test]
    fn test_authorization_header() {
        let (manager, store) = manager();
        assert_eq!(manager.authorization_header(), None);

        store.set(AUTH_TOKEN_KEY, "abc".to_string()).unwrap();
        assert_eq!(manager.authorization_header().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_current_user_decoded_from_store() {
        let (manager, store) = manager();
        let response = LoginResponse {
            id: "1".to_string(),
            email: "alice@example.com".to_string(),
            auth_token: "abc".to_string(),
            expires_in: 60,
        };
        store
            .set(CURRENT_USER_KEY, serde_json::to_string(&response).unwrap())
            .unwrap();

        assert_eq!(manager.current_user(), Some(response));
    }
}
