//! Application setup and wiring

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::application::{BillingEventHandler, RateLimiter, RequestDispatcher, UsageMeter};
use crate::config::{Config, StoreBackend};
use crate::infrastructure::signature::WebhookVerifier;
use crate::infrastructure::store::{CounterStore, MemoryStore, RestStore};
use crate::infrastructure::token::TokenVerifier;
use crate::presentation::{AppState, create_router};

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub shutdown_token: CancellationToken,
}

/// Spawns a background worker that periodically evicts expired entries from
/// the in-memory store. Respects the cancellation token for graceful
/// shutdown.
fn spawn_store_cleanup_worker(store: Arc<MemoryStore>, shutdown_token: CancellationToken) {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(Duration::from_secs(60));
        // Skip the immediate first tick; a fresh store has nothing to evict.
        interval_timer.tick().await;

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    let evicted = store.cleanup_expired().await;
                    if evicted > 0 {
                        tracing::debug!(evicted, "Evicted expired store entries");
                    }
                }
                _ = shutdown_token.cancelled() => {
                    tracing::info!("Store cleanup worker shutting down gracefully");
                    return;
                }
            }
        }
    });
}

/// Create the application router and return an AppHandle for shutdown coordination
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let shutdown_token = CancellationToken::new();

    let store: Arc<dyn CounterStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory counter store");
            let memory_store = Arc::new(MemoryStore::new());
            spawn_store_cleanup_worker(memory_store.clone(), shutdown_token.clone());
            memory_store
        }
        StoreBackend::Rest => {
            tracing::info!(base_url = %config.store.base_url, "Using REST counter store");
            Arc::new(RestStore::new(&config.store)?)
        }
    };

    let verifier = Arc::new(TokenVerifier::new(&config.auth));
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

    let app_state = AppState {
        verifier,
        dispatcher,
        usage_meter,
        billing,
    };

    let router = create_router(app_state, &config);

    Ok(AppHandle {
        router,
        shutdown_token,
    })
}
