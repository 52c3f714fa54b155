//! HTTP handlers for the gateway endpoints

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};

use crate::domain::GateError;
use crate::presentation::extractors::AuthCaller;
use crate::presentation::models::{
    DataResponse, ErrorResponse, HealthResponse, UsageResponse, WebhookAck,
};
use crate::presentation::routes::AppState;

/// Header carrying the billing provider's event signature.
pub const SIGNATURE_HEADER: &str = "metergate-signature";

/// Health check endpoint. Intentionally independent of the counter store so
/// probes keep passing while metered endpoints fail closed.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Current billing-period usage for the authenticated caller.
#[utoipa::path(
    get,
    path = "/usage",
    tag = "usage",
    responses(
        (status = 200, description = "Current usage", body = UsageResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 503, description = "Counter store unavailable", body = ErrorResponse)
    )
)]
pub async fn get_usage(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
) -> Result<Json<UsageResponse>, GateError> {
    let record = state
        .usage_meter
        .current_view(&caller.caller, caller.declared_tier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Counter store failure reading usage");
            GateError::StoreUnavailable
        })?;

    Ok(Json(UsageResponse::from_record(
        &record,
        state.usage_meter.free_monthly_limit(),
    )))
}

/// The metered action. Runs the full admission pipeline; denials are
/// stage-specific (401 / 429 / 403 / 503).
#[utoipa::path(
    post,
    path = "/data",
    tag = "data",
    responses(
        (status = 200, description = "Request admitted", body = DataResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 403, description = "Monthly quota exceeded", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 503, description = "Counter store unavailable", body = ErrorResponse)
    )
)]
pub async fn post_data(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
) -> Result<Json<DataResponse>, GateError> {
    let admission = state.dispatcher.dispatch(&caller).await?;

    Ok(Json(DataResponse {
        message: "Hello from the metered endpoint".to_string(),
        usage: UsageResponse::from_record(
            &admission.usage,
            state.usage_meter.free_monthly_limit(),
        ),
    }))
}

/// Billing provider webhook. The raw body is verified against the signature
/// header before any parsing; a missing header is treated like a bad
/// signature, with no detail about what failed.
#[utoipa::path(
    post,
    path = "/billing/webhook",
    tag = "billing",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event processed or intentionally ignored", body = WebhookAck),
        (status = 400, description = "Signature verification failed", body = ErrorResponse),
        (status = 503, description = "Counter store unavailable", body = ErrorResponse)
    )
)]
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, GateError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(GateError::WebhookSignatureInvalid)?;

    state.billing.handle(&body, signature).await?;

    Ok(Json(WebhookAck { received: true }))
}
