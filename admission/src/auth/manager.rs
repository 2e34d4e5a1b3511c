//! Authentication manager implementation.

use super::{
    codes::{generate_code, hash_code},
    errors::{AuthError, AuthResult},
    models::{
        AccessTokenClaims, ChangePasswordRequest, Claim, CodePurpose, IssuedToken, LoginRequest,
        NewUser, PasswordResetConfirm, RegisterRequest, User, UserId, UserRecord,
    },
    password::{PasswordHasher, PasswordPolicy},
    tokens::TokenIssuer,
};
use crate::db::{CodeRepository, UserRepository};
use crate::email::{Email, EmailSender};
use crate::validation::{ValidationErrors, check_email, normalize_email};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Account behaviour knobs
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub password_policy: PasswordPolicy,
    /// Lifetime of email confirmation codes
    pub confirmation_code_ttl: Duration,
    /// Lifetime of password reset codes
    pub reset_code_ttl: Duration,
    /// Refuse login until the email is confirmed
    pub require_confirmed_email: bool,
    /// Report success for password recovery on unknown emails
    pub mask_unknown_recovery_email: bool,
    /// Base URL of this API, used for the confirmation callback link
    pub public_base_url: String,
    /// Base URL of the web client, used for the recovery link
    pub client_base_url: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            password_policy: PasswordPolicy::default(),
            confirmation_code_ttl: Duration::hours(24),
            reset_code_ttl: Duration::hours(1),
            require_confirmed_email: false,
            mask_unknown_recovery_email: false,
            public_base_url: "http://localhost:8080".to_string(),
            client_base_url: "http://localhost:4200".to_string(),
        }
    }
}

/// Authentication manager
///
/// Stateless with respect to sessions: the only shared mutable state lives
/// behind the credential and code repositories.
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn CodeRepository>,
    email: Arc<dyn EmailSender>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
    settings: AuthSettings,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - Credential store
    /// * `codes` - Confirmation/reset code store
    /// * `email` - Outgoing email collaborator
    /// * `tokens` - Access token issuer
    /// * `hasher` - Password hasher carrying the server-side pepper
    /// * `settings` - Account behaviour knobs
    pub fn new(
        users: Arc<dyn UserRepository>,
        codes: Arc<dyn CodeRepository>,
        email: Arc<dyn EmailSender>,
        tokens: TokenIssuer,
        hasher: PasswordHasher,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            codes,
            email,
            tokens,
            hasher,
            settings,
        }
    }

    /// Register a new user
    ///
    /// Creates the identity with an unconfirmed email and mails a
    /// confirmation link embedding the user id and a fresh code. The code is
    /// never returned to the caller.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed input or password policy failure
    /// * `AuthError::EmailTaken` - Email already registered
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let email = normalize_email(&request.email);

        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &email);
        errors.require("first_name", &request.first_name);
        errors.require("last_name", &request.last_name);
        self.settings
            .password_policy
            .check("password", &request.password, &mut errors);
        errors.into_result()?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let user = self
            .users
            .create_user(NewUser {
                email,
                password_hash,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            })
            .await?;

        self.send_confirmation(&user).await?;

        log::info!("Registered account {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Confirm an email address and grant the `User` claim
    ///
    /// When a store write fails after the code was consumed, a new
    /// confirmation link is mailed before the error is returned.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - User id or code missing
    /// * `AuthError::UserNotFound` - Unknown user id
    /// * `AuthError::InvalidCode` - Code invalid, expired or already consumed
    pub async fn confirm_email(&self, user_id: &str, code: &str) -> AuthResult<User> {
        let mut errors = ValidationErrors::new();
        errors.require("userId", user_id);
        errors.require("code", code);
        errors.into_result()?;

        let user_id = Uuid::parse_str(user_id.trim()).map_err(|_| AuthError::UserNotFound)?;
        let record = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .codes
            .consume_code(user_id, CodePurpose::EmailConfirmation, &hash_code(code))
            .await?
        {
            return Err(AuthError::InvalidCode);
        }

        if let Err(e) = self.finish_confirmation(user_id).await {
            // Code already spent, mail a replacement
            log::error!(
                "Confirmation of account {} failed after its code was consumed: {}",
                user_id,
                e
            );
            if let Err(reissue) = self.send_confirmation(&record.user).await {
                log::warn!("Failed to re-issue confirmation code for {}: {}", user_id, reissue);
            }
            return Err(e);
        }

        log::info!("Confirmed email for account {}", user_id);
        Ok(User {
            email_confirmed: true,
            ..record.user
        })
    }

    /// Start password recovery by mailing a reset link
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed email
    /// * `AuthError::UserNotFound` - Unknown email, unless masking is enabled
    pub async fn initiate_password_recovery(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &email);
        errors.into_result()?;

        let Some(record) = self.users.find_by_email(&email).await? else {
            if self.settings.mask_unknown_recovery_email {
                log::info!("Password recovery requested for unknown email");
                return Ok(());
            }
            return Err(AuthError::UserNotFound);
        };

        let code = self
            .issue_code(record.user.id, CodePurpose::PasswordReset, self.settings.reset_code_ttl)
            .await?;
        let callback_url = format!(
            "{}/recovery?userEmail={}&code={}",
            self.settings.client_base_url.trim_end_matches('/'),
            urlencoding::encode(&record.user.email),
            code
        );

        self.dispatch(Email {
            address: record.user.email.clone(),
            subject: "FIIAdmis - Password reset".to_string(),
            body: format!("Reset your password using this <a href=\"{callback_url}\">link</a>"),
        })
        .await;

        Ok(())
    }

    /// Finish password recovery with the mailed code
    ///
    /// The new password is checked against the policy before the code is
    /// consumed, so a rejected password leaves the code usable.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Missing fields or password policy failure
    /// * `AuthError::UserNotFound` - Unknown email
    /// * `AuthError::InvalidCode` - Code invalid, expired or already consumed
    pub async fn complete_password_recovery(&self, request: PasswordResetConfirm) -> AuthResult<()> {
        let email = normalize_email(&request.email);
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &email);
        errors.require("code", &request.code);
        self.settings
            .password_policy
            .check("password", &request.new_password, &mut errors);
        errors.into_result()?;

        let record = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .codes
            .consume_code(record.user.id, CodePurpose::PasswordReset, &hash_code(&request.code))
            .await?
        {
            return Err(AuthError::InvalidCode);
        }

        let password_hash = self.hasher.hash(&request.new_password)?;
        self.users
            .update_password_hash(record.user.id, &password_hash)
            .await?;

        log::info!("Password reset for account {}", record.user.id);
        Ok(())
    }

    /// Change the password of an authenticated user
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - Unknown email
    /// * `AuthError::InvalidCredentials` - Current password does not match;
    ///   the stored hash is left untouched
    /// * `AuthError::Validation` - New password fails the policy
    pub async fn change_password(&self, email: &str, request: ChangePasswordRequest) -> AuthResult<()> {
        let record = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.hasher
            .verify(&request.current_password, &record.password_hash)?;
        self.settings
            .password_policy
            .validate("password", &request.new_password)?;

        let password_hash = self.hasher.hash(&request.new_password)?;
        self.users
            .update_password_hash(record.user.id, &password_hash)
            .await?;

        log::info!("Password changed for account {}", record.user.id);
        Ok(())
    }

    /// Login a user
    ///
    /// # Returns
    ///
    /// * `AuthResult<(User, IssuedToken)>` - User and a token carrying every claim it holds
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    /// * `AuthError::EmailNotConfirmed` - Confirmation required and missing
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, IssuedToken)> {
        let record = self
            .users
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.hasher.verify(&request.password, &record.password_hash)?;

        if self.settings.require_confirmed_email && !record.user.email_confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        let claims = self.users.claims(record.user.id).await?;
        let token = self.tokens.issue(&record.user, &claims)?;

        Ok((record.user, token))
    }

    /// Verify an access token
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.tokens.verify(token)
    }

    /// Grant a claim to a user
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Blank type or value, or a type that would
    ///   shadow a registered token member such as `sub` or `exp`
    pub async fn add_claim(&self, user_id: UserId, claim: &Claim) -> AuthResult<()> {
        let mut errors = ValidationErrors::new();
        errors.require("claim_type", &claim.claim_type);
        errors.require("value", &claim.value);
        if claim.is_reserved() {
            errors.add(
                "claim_type",
                format!("'{}' is a reserved token member", claim.claim_type),
            );
        }
        errors.into_result()?;

        self.users.add_claim(user_id, claim).await?;
        log::info!("Granted claim {} to account {}", claim, user_id);
        Ok(())
    }

    /// Grant `Admin=Administrator` to the account registered under `email`
    pub async fn grant_admin(&self, email: &str) -> AuthResult<User> {
        let record = self
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.add_claim(record.user.id, &Claim::admin()).await?;
        Ok(record.user)
    }

    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        self.users.find_by_email(&normalize_email(email)).await
    }

    pub async fn claims(&self, user_id: UserId) -> AuthResult<Vec<Claim>> {
        self.users.claims(user_id).await
    }

    /// Check the credential store is reachable
    pub async fn health_check(&self) -> AuthResult<()> {
        self.users.health_check().await
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Issue a confirmation code and mail the callback link
    async fn send_confirmation(&self, user: &User) -> AuthResult<()> {
        let code = self
            .issue_code(user.id, CodePurpose::EmailConfirmation, self.settings.confirmation_code_ttl)
            .await?;
        let callback_url = format!(
            "{}/api/account/confirm-email?userId={}&code={}",
            self.settings.public_base_url.trim_end_matches('/'),
            user.id,
            code
        );

        self.dispatch(Email {
            address: user.email.clone(),
            subject: "FIIAdmis - Email confirmation".to_string(),
            body: format!("Confirm your email address using this <a href=\"{callback_url}\">link</a>"),
        })
        .await;
        Ok(())
    }

    async fn finish_confirmation(&self, user_id: UserId) -> AuthResult<()> {
        self.users.mark_email_confirmed(user_id).await?;
        self.users.add_claim(user_id, &Claim::user()).await
    }

    async fn issue_code(&self, user_id: UserId, purpose: CodePurpose, ttl: Duration) -> AuthResult<String> {
        let code = generate_code();
        self.codes
            .store_code(user_id, purpose, &hash_code(&code), Utc::now() + ttl)
            .await?;
        Ok(code)
    }

    async fn dispatch(&self, email: Email) {
        let address = email.address.clone();
        if let Err(e) = self.email.send_email(email).await {
            log::warn!("Failed to send email to {}: {}", address, e);
        }
    }
}
