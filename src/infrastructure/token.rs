//! Bearer token verification
//!
//! Tokens are issued and signed by the external identity provider; this side
//! only verifies. The signing secret is obtained out of band through
//! configuration and loaded once at startup, so a missing key source fails
//! the process, never an individual request. Verification itself is pure:
//! no store access, no grace period on expiry.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::AuthConfig;
use crate::domain::{CallerId, GateError, Tier};

/// Claims carried by an inbound bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    tier: String,
    exp: i64,
    iss: String,
}

/// Identity assertion extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCaller {
    pub caller: CallerId,
    /// Tier declared at token issue time. May lag behind a billing event;
    /// the tier resolver decides which one wins.
    pub declared_tier: Tier,
    pub expires_at: DateTime<Utc>,
}

/// Verifies token signatures and claims against the configured issuer.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is a hard edge: no grace period.
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Validate a raw bearer string and extract the caller assertion.
    pub fn verify(&self, token: &str) -> Result<VerifiedCaller, GateError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => GateError::Expired,
                _ => GateError::InvalidToken,
            }
        })?;

        let claims = data.claims;
        let declared_tier = Tier::from_str(&claims.tier).map_err(|_| {
            tracing::debug!(tier = %claims.tier, "Token carried unknown tier claim");
            GateError::InvalidToken
        })?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(GateError::InvalidToken)?;

        Ok(VerifiedCaller {
            caller: CallerId::new(claims.sub),
            declared_tier,
            expires_at,
        })
    }
}
