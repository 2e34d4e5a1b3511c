//! Password policy and hashing.

use super::errors::{AuthError, AuthResult};
use crate::ValidationErrors;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Configurable password rules
///
/// The defaults mirror the deployed configuration: six characters and no
/// required character classes. Tighten them through configuration, not code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            require_digit: false,
            require_lowercase: false,
            require_uppercase: false,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Record every rule `password` breaks under `field`
    pub fn check(&self, field: &str, password: &str, errors: &mut ValidationErrors) {
        if password.chars().count() < self.min_length {
            errors.add(
                field,
                format!("Password must be at least {} characters", self.min_length),
            );
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.add(field, "Password must contain a digit");
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            errors.add(field, "Password must contain a lowercase letter");
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            errors.add(field, "Password must contain an uppercase letter");
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            errors.add(field, "Password must contain a non-alphanumeric character");
        }
    }

    /// Validate a password on its own
    pub fn validate(&self, field: &str, password: &str) -> AuthResult<()> {
        let mut errors = ValidationErrors::new();
        self.check(field, password, &mut errors);
        errors.into_result().map_err(AuthError::Validation)
    }
}

/// Argon2id hashing with a server-side pepper
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
}

impl PasswordHasher {
    pub fn new(pepper: String) -> Self {
        Self { pepper }
    }

    /// Hash password with Argon2id + pepper
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    pub fn verify(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_length_only() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("password", "Secret1").is_ok());
        assert!(policy.validate("password", "aaaaaa").is_ok());
        assert!(policy.validate("password", "abc").is_err());
    }

    #[test]
    fn test_strict_policy_reports_every_rule() {
        let policy = PasswordPolicy {
            min_length: 10,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        };

        let mut errors = ValidationErrors::new();
        policy.check("password", "abc", &mut errors);
        assert_eq!(errors.field("password").map(<[String]>::len), Some(4));
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new("pepper".to_string());
        let hash = hasher.hash("Secret1").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("Secret1", &hash).is_ok());
        assert!(matches!(
            hasher.verify("secret1", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_pepper_is_part_of_hash() {
        let hash = PasswordHasher::new("pepper-a".to_string()).hash("Secret1").unwrap();
        let other = PasswordHasher::new("pepper-b".to_string());
        assert!(other.verify("Secret1", &hash).is_err());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new("pepper".to_string());
        assert_ne!(hasher.hash("Secret1").unwrap(), hasher.hash("Secret1").unwrap());
    }
}
