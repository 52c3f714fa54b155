//! Authentication extractors for Axum

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use std::sync::Arc;

use crate::domain::GateError;
use crate::infrastructure::token::{TokenVerifier, VerifiedCaller};

/// State for the authentication extractor, injected into request extensions
/// by the router's middleware stack.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

/// Verified caller extracted from the `Authorization: Bearer` header.
///
/// Rejection is stage-specific: a missing or malformed header is
/// `Unauthenticated`, while a present-but-bad token is `InvalidToken` or
/// `Expired`; all map to 401 with a generic body.
#[derive(Debug, Clone)]
pub struct AuthCaller(pub VerifiedCaller);

impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<AuthState>()
            .ok_or_else(|| GateError::internal("Auth state not found in request extensions"))?;

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(GateError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(GateError::Unauthenticated)?;

        let verified = auth_state.verifier.verify(token)?;
        Ok(AuthCaller(verified))
    }
}
