//! Admission pipeline error taxonomy

use thiserror::Error;

/// Stage-specific outcomes of the admission pipeline.
///
/// Each stage fails with its own variant so denials stay distinguishable all
/// the way to the HTTP layer; none of the variants carry store internals or
/// private token claims.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Missing or malformed authorization header")]
    Unauthenticated,

    #[error("Invalid token provided")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Monthly quota exceeded: {used}/{limit}")]
    QuotaExceeded { used: u64, limit: u64 },

    #[error("Counter store unavailable")]
    StoreUnavailable,

    #[error("Webhook signature verification failed")]
    WebhookSignatureInvalid,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GateError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
