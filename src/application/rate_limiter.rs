//! Fixed-window request rate limiting
//!
//! Caps request frequency per caller over a short fixed window. The
//! read-then-write against the store is not atomic: two racing requests can
//! both observe the same pre-increment count and both be admitted. The
//! overshoot is bounded by the number of concurrently in-flight requests for
//! one caller and is an accepted trade against coordination cost; whether
//! that bound is tolerable for a deployment is a knob (window and ceiling
//! are configuration), not a hidden assumption.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::domain::{CallerId, RateWindowRecord};
use crate::infrastructure::store::{CounterStore, StoreError, rate_key};

/// Outcome of a rate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u64 },
    Limited { retry_after_seconds: u64 },
}

/// Per-caller fixed-window limiter backed by the counter store.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Check the caller's current window and consume one slot if available.
    pub async fn check_and_increment(
        &self,
        caller: &CallerId,
    ) -> Result<RateDecision, StoreError> {
        self.apply(caller, Utc::now()).await
    }

    async fn apply(
        &self,
        caller: &CallerId,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, StoreError> {
        let key = rate_key(caller);
        let window = self.config.window_seconds;

        // An absent or elapsed window record means a fresh window starting
        // now; old windows are superseded, never merged.
        let existing: Option<RateWindowRecord> = self.store.get(&key).await?;
        let mut record = match existing {
            Some(record) if record.is_active(now, window) => record,
            _ => RateWindowRecord::fresh(now),
        };

        if record.count >= self.config.max_requests {
            let retry_after = window
                .saturating_sub(record.elapsed_seconds(now))
                .clamp(1, window);
            tracing::debug!(caller = %caller, retry_after, "Rate ceiling hit");
            return Ok(RateDecision::Limited {
                retry_after_seconds: retry_after,
            });
        }

        record.count += 1;
        // TTL slightly past the window so stale records self-clean without a
        // sweeper.
        let ttl = Duration::from_secs(window + 60);
        self.store.put(&key, &record, Some(ttl)).await?;

        Ok(RateDecision::Allowed {
            remaining: self.config.max_requests - record.count,
        })
    }
}
