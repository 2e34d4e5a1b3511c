//! Field-level validation state shared by every input model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest email address accepted anywhere in the system
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation failures keyed by field name
///
/// Serializes as a plain `{ "field": ["message", ...] }` map so it can be
/// returned to clients as the `model_state` of a failed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Require a non-blank value for `field`
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("'{field}' must not be empty"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Turn the collected state into a result, failing if anything was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Shorthand for a single-field failure
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Normalize an email address for lookup and uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check the shape of an email address
///
/// Accepts `local@domain.tld` with no whitespace; deliverability is the
/// confirmation email's job, not this function's.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Validate an email field, recording failures under `field`
pub fn check_email(errors: &mut ValidationErrors, field: &str, email: &str) {
    if email.trim().is_empty() {
        errors.add(field, "Email is required");
    } else if !is_valid_email(email.trim()) {
        errors.add(field, "Email is not a valid address");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_multiple_fields() {
        let mut errors = ValidationErrors::new();
        errors.require("first_name", "");
        errors.require("last_name", "  ");
        errors.require("email", "a@b.ro");

        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["first_name", "last_name"]);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("password", "too short");
        errors.add("password", "too common");
        assert_eq!(errors.to_string(), "password: too short; password: too common");
    }

    #[test]
    fn test_serializes_as_map() {
        let errors = ValidationErrors::single("email", "Email is required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "email": ["Email is required"] }));
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+tag@info.uaic.ro"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("alice@@example.com"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(!is_valid_email("alice@example."));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
