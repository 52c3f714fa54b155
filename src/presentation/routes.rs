//! Route definitions and server setup

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::application::{BillingEventHandler, RequestDispatcher, UsageMeter};
use crate::config::Config;
use crate::infrastructure::token::TokenVerifier;
use crate::presentation::middleware::{inject_auth_state_middleware, logging_middleware};
use crate::presentation::models::{
    DataResponse, ErrorResponse, HealthResponse, UsageResponse, WebhookAck,
};
use crate::presentation::handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub dispatcher: Arc<RequestDispatcher>,
    pub usage_meter: Arc<UsageMeter>,
    pub billing: Arc<BillingEventHandler>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::handlers::health_check,
        crate::presentation::handlers::get_usage,
        crate::presentation::handlers::post_data,
        crate::presentation::handlers::billing_webhook
    ),
    components(
        schemas(
            HealthResponse,
            UsageResponse,
            DataResponse,
            WebhookAck,
            ErrorResponse,
            crate::domain::Tier
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "usage", description = "Per-caller usage visibility"),
        (name = "data", description = "Metered resource access"),
        (name = "billing", description = "Billing provider webhook")
    ),
    info(
        title = "Metergate API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Tier-aware metering gateway: token verification, rate limiting and monthly usage quotas in front of a metered resource"
    )
)]
pub struct ApiDoc;

/// Create the application router with all middleware layers
pub fn create_router(app_state: AppState, config: &Config) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/usage", get(handlers::get_usage))
        .route("/data", post(handlers::post_data))
        .route("/billing/webhook", post(handlers::billing_webhook));

    if config.server.enable_docs {
        router = router.route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.server.allowed_origins))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_seconds,
                )))
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    inject_auth_state_middleware,
                ))
                .layer(middleware::from_fn(logging_middleware)),
        )
        .with_state(app_state)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
