//! Shared helpers for gateway integration tests

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use metergate::Config;
use metergate::application::{BillingEventHandler, RateLimiter, RequestDispatcher, UsageMeter};
use metergate::domain::{CallerId, UsageRecord};
use metergate::infrastructure::signature::WebhookVerifier;
use metergate::infrastructure::store::{CounterStore, MemoryStore, StoreError, usage_key};
use metergate::infrastructure::token::TokenVerifier;
use metergate::presentation::handlers::SIGNATURE_HEADER;
use metergate::presentation::{AppState, create_router};

pub const JWT_SECRET: &str = "integration-test-secret-32-characters!!";
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const ISSUER: &str = "metergate-idp";

/// Baseline configuration for tests: real secrets, small quota, and a rate
/// ceiling high enough to stay out of the way unless a test lowers it.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.auth.issuer = ISSUER.to_string();
    config.billing.webhook_secret = WEBHOOK_SECRET.to_string();
    config.rate_limit.max_requests = 50;
    config.quota.free_monthly_limit = 5;
    config
}

/// A fully wired gateway over an in-memory store the test can inspect.
pub struct TestGateway {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn CounterStore> = store.clone();
        Self {
            router: build_router(shared, &config),
            store,
        }
    }

    /// Write a usage record directly into the store, bypassing the gateway.
    pub async fn seed_usage(&self, caller: &str, record: &UsageRecord) {
        let store: &dyn CounterStore = self.store.as_ref();
        store
            .put(&usage_key(&CallerId::new(caller)), record, None)
            .await
            .unwrap();
    }

    /// Read the usage record back out of the store.
    pub async fn stored_usage(&self, caller: &str) -> Option<UsageRecord> {
        let store: &dyn CounterStore = self.store.as_ref();
        store
            .get(&usage_key(&CallerId::new(caller)))
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(axum::http::Method::GET, path, token, Body::empty()))
            .await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(axum::http::Method::POST, path, token, Body::empty()))
            .await
    }

    pub async fn post_webhook(&self, body: &str, signature: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(axum::http::Method::POST)
            .uri("/billing/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn build_router(store: Arc<dyn CounterStore>, config: &Config) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(store.clone(), config.rate_limit.clone()));
    let usage_meter = Arc::new(UsageMeter::new(store.clone(), config.quota.clone()));
    let dispatcher = Arc::new(RequestDispatcher::new(
        store.clone(),
        rate_limiter,
        usage_meter.clone(),
    ));
    let billing = Arc::new(BillingEventHandler::new(
        WebhookVerifier::new(&config.billing),
        store,
    ));

    let state = AppState {
        verifier: Arc::new(TokenVerifier::new(&config.auth)),
        dispatcher,
        usage_meter,
        billing,
    };

    create_router(state, config)
}

fn request(
    method: axum::http::Method,
    path: &str,
    token: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body).unwrap()
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    tier: String,
    exp: i64,
    iss: String,
}

/// Mint a token the gateway's verifier accepts. Negative offsets produce an
/// already-expired token.
pub fn mint_token(sub: &str, tier: &str, exp_offset_secs: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        tier: tier.to_string(),
        exp: Utc::now().timestamp() + exp_offset_secs,
        iss: ISSUER.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn sign_webhook(body: &str) -> String {
    sign_webhook_at(body, Utc::now().timestamp())
}

/// Produce a `t=...,v1=...` signature header for `body` with an explicit
/// timestamp, matching the provider's scheme.
pub fn sign_webhook_at(body: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Store stub whose every operation times out, for fail-closed coverage.
pub struct FailingStore;

#[async_trait::async_trait]
impl CounterStore for FailingStore {
    async fn get_raw(&self, _key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn put_raw(
        &self,
        _key: &str,
        _value: serde_json::Value,
        _ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Timeout)
    }
}
