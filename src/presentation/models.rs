//! API DTOs and error envelope

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{GateError, Tier, UsageRecord};

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "ok")]
    pub status: String,
}

/// Current-period usage for one caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    /// Requests consumed in the current billing period
    pub usage_count: u64,
    /// Period quota; null for unlimited tiers
    pub limit: Option<u64>,
    /// Effective subscription tier
    pub tier: Tier,
    /// First day of the billing period (inclusive, UTC)
    pub period_start: NaiveDate,
    /// First day of the next billing period (exclusive, UTC)
    pub period_end: NaiveDate,
}

impl UsageResponse {
    pub fn from_record(record: &UsageRecord, free_monthly_limit: u64) -> Self {
        Self {
            usage_count: record.usage_count,
            limit: record.tier.monthly_limit(free_monthly_limit),
            tier: record.tier,
            period_start: record.period_start,
            period_end: record.period_end,
        }
    }
}

/// Response of an admitted metered request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataResponse {
    /// Business payload of the metered action
    #[schema(example = "Hello from the metered endpoint")]
    pub message: String,
    /// Usage after this request was counted
    pub usage: UsageResponse,
}

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Error response envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    #[schema(example = "RATE_LIMITED")]
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Optional structured details
    pub details: Option<serde_json::Value>,
    /// Request id for log correlation
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        // Auth failures share one generic client message; the log line keeps
        // the distinction. Nothing here leaks claims or store internals.
        let (status, code, message, details) = match &self {
            GateError::Unauthenticated | GateError::InvalidToken | GateError::Expired => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                None,
            ),
            GateError::RateLimited {
                retry_after_seconds,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!(
                    "Rate limit exceeded. Please retry after {} seconds.",
                    retry_after_seconds
                ),
                Some(serde_json::json!({ "retry_after": retry_after_seconds })),
            ),
            GateError::QuotaExceeded { used, limit } => (
                StatusCode::FORBIDDEN,
                "QUOTA_EXCEEDED",
                "Monthly quota exceeded. Upgrade to continue.".to_string(),
                Some(serde_json::json!({ "usage_count": used, "limit": limit })),
            ),
            GateError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "Service temporarily unavailable".to_string(),
                None,
            ),
            GateError::WebhookSignatureInvalid => (
                StatusCode::BAD_REQUEST,
                "INVALID_SIGNATURE",
                "Webhook rejected".to_string(),
                None,
            ),
            GateError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            ),
        };

        let error_response = ErrorResponse {
            code: code.to_string(),
            message,
            details,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        tracing::warn!(
            error = %self,
            http_status = %status,
            error_code = code,
            request_id = %error_response.request_id,
            "Request denied"
        );

        let mut response = (status, Json(error_response)).into_response();

        if let GateError::RateLimited {
            retry_after_seconds,
        } = &self
        {
            let headers = response.headers_mut();
            match HeaderValue::from_str(&retry_after_seconds.to_string()) {
                Ok(value) => {
                    headers.insert("retry-after", value);
                }
                Err(_) => {
                    headers.insert("retry-after", HeaderValue::from_static("60"));
                }
            }
        }

        response
    }
}
