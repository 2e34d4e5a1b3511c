//! Access token issuing and verification.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, Claim, IssuedToken, User, group_claims},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

/// Minimum accepted HMAC secret length in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Signing configuration for access tokens
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC-SHA256 signing secret
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Lifetime of every issued token
    pub valid_for: Duration,
}

/// Mints and verifies signed, time-bound access tokens
///
/// Holds no per-token state: a token is valid iff its signature verifies,
/// it has not expired, and its issuer and audience match.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    valid_for: Duration,
}

impl TokenIssuer {
    /// Create a token issuer from signing settings
    ///
    /// # Errors
    ///
    /// * `AuthError::Configuration` - Secret missing or too short, or empty issuer/audience
    pub fn new(settings: &JwtSettings) -> AuthResult<Self> {
        if settings.secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "signing secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if settings.issuer.is_empty() || settings.audience.is_empty() {
            return Err(AuthError::Configuration(
                "token issuer and audience must be set".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_exp = true;
        // Strict expiry, no grace window
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            valid_for: settings.valid_for,
        })
    }

    /// Issue a token for `user` carrying `claims`
    pub fn issue(&self, user: &User, claims: &[Claim]) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let payload = AccessTokenClaims {
            sub: user.email.clone(),
            id: user.id,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + self.valid_for).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            roles: group_claims(claims),
        };

        let auth_token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)?;

        Ok(IssuedToken {
            auth_token,
            expires_in: self.valid_for.num_seconds(),
        })
    }

    /// Verify an access token
    ///
    /// # Returns
    ///
    /// * `AuthResult<AccessTokenClaims>` - Decoded claims or error
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    pub fn valid_for(&self) -> Duration {
        self.valid_for
    }
}
