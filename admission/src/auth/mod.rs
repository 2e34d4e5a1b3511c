//! Authentication module providing registration, email confirmation, password
//! recovery, login and claim-based policies.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT access tokens carrying issuer, audience, expiry and role claims
//! - Single-use, time-bound confirmation and reset codes
//! - Named policies (`User`, `Admin`) evaluated against token claims
//!
//! ## Example
//!
//! ```no_run
//! use admission::auth::{
//!     AuthManager, AuthSettings, JwtSettings, PasswordHasher, RegisterRequest, TokenIssuer,
//! };
//! use admission::db::{MemoryCodeRepository, MemoryUserRepository};
//! use admission::email::LogEmailSender;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = TokenIssuer::new(&JwtSettings {
//!         secret: std::env::var("JWT_SECRET")?,
//!         issuer: "admission-api".to_string(),
//!         audience: "admission-web".to_string(),
//!         valid_for: chrono::Duration::hours(2),
//!     })?;
//!     let auth = AuthManager::new(
//!         Arc::new(MemoryUserRepository::new()),
//!         Arc::new(MemoryCodeRepository::new()),
//!         Arc::new(LogEmailSender),
//!         tokens,
//!         PasswordHasher::new(std::env::var("PASSWORD_PEPPER")?),
//!         AuthSettings::default(),
//!     );
//!
//!     let user = auth
//!         .register(RegisterRequest {
//!             email: "alice@example.com".to_string(),
//!             password: "Secret1".to_string(),
//!             first_name: "Alice".to_string(),
//!             last_name: "Pop".to_string(),
//!         })
//!         .await?;
//!     println!("Registered user: {}", user.email);
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod policy;
pub mod tokens;

pub use errors::{AuthError, AuthResult};
pub use manager::{AuthManager, AuthSettings};
pub use models::{
    AccessTokenClaims, ChangePasswordRequest, Claim, ClaimValues, CodePurpose, IssuedToken,
    LoginRequest, NewUser, PasswordResetConfirm, RegisterRequest, User, UserId, UserRecord,
};
pub use password::{PasswordHasher, PasswordPolicy};
pub use policy::Policy;
pub use tokens::{JwtSettings, TokenIssuer};
