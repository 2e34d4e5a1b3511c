//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// User ID type
pub type UserId = Uuid;

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// User together with the stored password hash
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

/// Identity ready to be persisted by a credential store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Second phase of password recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Password change for an authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Named key/value fact attached to an identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub const USER_TYPE: &'static str = "User";
    pub const USER_VALUE: &'static str = "User";
    pub const ADMIN_TYPE: &'static str = "Admin";
    pub const ADMIN_VALUE: &'static str = "Administrator";

    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }

    /// `User=User`, granted on email confirmation
    pub fn user() -> Self {
        Self::new(Self::USER_TYPE, Self::USER_VALUE)
    }

    /// `Admin=Administrator`, granted by an operator
    pub fn admin() -> Self {
        Self::new(Self::ADMIN_TYPE, Self::ADMIN_VALUE)
    }

    /// Token members a role claim may not shadow
    pub const RESERVED_TYPES: [&'static str; 8] =
        ["sub", "id", "iss", "aud", "exp", "iat", "nbf", "jti"];

    /// Whether the claim type names a registered token member
    pub fn is_reserved(&self) -> bool {
        Self::RESERVED_TYPES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(self.claim_type.trim()))
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.claim_type, self.value)
    }
}

/// Values carried by one claim type in a token payload
///
/// A single value is a plain string member; several values for the same type
/// become an array, e.g. `"Admin": ["Administrator", "Auditor"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValues {
    One(String),
    Many(Vec<String>),
}

impl ClaimValues {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        match self {
            ClaimValues::One(value) => std::slice::from_ref(value).iter(),
            ClaimValues::Many(values) => values.iter(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.iter().any(|held| held == value)
    }

    fn push(&mut self, value: String) {
        match self {
            ClaimValues::One(first) => {
                if *first != value {
                    let first = std::mem::take(first);
                    *self = ClaimValues::Many(vec![first, value]);
                }
            }
            ClaimValues::Many(values) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
    }
}

/// Group claims by type for a token payload
pub fn group_claims(claims: &[Claim]) -> BTreeMap<String, ClaimValues> {
    let mut roles: BTreeMap<String, ClaimValues> = BTreeMap::new();
    for claim in claims {
        match roles.get_mut(&claim.claim_type) {
            Some(values) => values.push(claim.value.clone()),
            None => {
                roles.insert(claim.claim_type.clone(), ClaimValues::One(claim.value.clone()));
            }
        }
    }
    roles
}

/// JWT claims for access token
///
/// Role claims are flattened into the payload as top-level members, e.g.
/// `"User": "User"`. Their types never collide with the registered members
/// below; see [`Claim::is_reserved`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,           // Email the identity logs in with
    pub id: UserId,
    pub iss: String,
    pub aud: String,
    pub exp: i64,              // Expiration timestamp
    pub iat: i64,              // Issued at timestamp
    pub jti: String,
    #[serde(flatten)]
    pub roles: BTreeMap<String, ClaimValues>,
}

impl AccessTokenClaims {
    /// Role claims carried by the token
    pub fn claims(&self) -> Vec<Claim> {
        self.roles
            .iter()
            .flat_map(|(claim_type, values)| {
                values.iter().map(move |value| Claim::new(claim_type, value))
            })
            .collect()
    }

    pub fn has_claim(&self, claim: &Claim) -> bool {
        self.roles
            .get(&claim.claim_type)
            .is_some_and(|values| values.contains(&claim.value))
    }
}

/// Signed token handed to the client on login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub auth_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Action a single-use code unlocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodePurpose {
    EmailConfirmation,
    PasswordReset,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::EmailConfirmation => "email_confirmation",
            CodePurpose::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
