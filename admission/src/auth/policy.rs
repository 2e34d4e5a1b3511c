//! Named authorization policies.

use super::models::{AccessTokenClaims, Claim};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named rule requiring a specific claim to be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// Confirmed account holder (`User=User`)
    User,
    /// Administrator (`Admin=Administrator`)
    Admin,
}

impl Policy {
    /// Claim the policy requires
    pub fn required_claim(&self) -> Claim {
        match self {
            Policy::User => Claim::user(),
            Policy::Admin => Claim::admin(),
        }
    }

    /// Evaluate the policy against a set of claims
    pub fn is_satisfied_by(&self, claims: &[Claim]) -> bool {
        let required = self.required_claim();
        claims.iter().any(|claim| *claim == required)
    }

    /// Evaluate the policy against decoded token claims
    pub fn allows(&self, token: &AccessTokenClaims) -> bool {
        token.has_claim(&self.required_claim())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Policy::User => "User",
            Policy::Admin => "Admin",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
