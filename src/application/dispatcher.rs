//! Per-request admission pipeline
//!
//! Orchestrates rate check, tier resolution and usage metering for one
//! verified caller. Each stage short-circuits: a rate denial never reaches
//! the usage meter, so retry storms cannot consume quota. Store failures
//! fail closed.

use chrono::Utc;
use std::sync::Arc;

use crate::application::rate_limiter::{RateDecision, RateLimiter};
use crate::application::tier_resolver::resolve_tier;
use crate::application::usage_meter::{UsageDecision, UsageMeter};
use crate::domain::{GateError, Tier, UsageRecord};
use crate::infrastructure::store::{CounterStore, StoreError, usage_key};
use crate::infrastructure::token::VerifiedCaller;

/// Successful admission: the request may proceed to the metered resource.
#[derive(Debug, Clone)]
pub struct Admission {
    pub tier: Tier,
    pub usage: UsageRecord,
    /// Requests left this period; `None` for unlimited tiers.
    pub remaining: Option<u64>,
}

/// Runs the full admission pipeline for each inbound metered request.
pub struct RequestDispatcher {
    store: Arc<dyn CounterStore>,
    rate_limiter: Arc<RateLimiter>,
    usage_meter: Arc<UsageMeter>,
}

impl RequestDispatcher {
    pub fn new(
        store: Arc<dyn CounterStore>,
        rate_limiter: Arc<RateLimiter>,
        usage_meter: Arc<UsageMeter>,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            usage_meter,
        }
    }

    /// Rate check, then tier resolution, then usage check. The usage record
    /// read for tier resolution is handed to the meter so the hot path does
    /// a single usage read.
    pub async fn dispatch(&self, caller: &VerifiedCaller) -> Result<Admission, GateError> {
        match self
            .rate_limiter
            .check_and_increment(&caller.caller)
            .await
            .map_err(fail_closed)?
        {
            RateDecision::Allowed { .. } => {}
            RateDecision::Limited {
                retry_after_seconds,
            } => {
                return Err(GateError::RateLimited {
                    retry_after_seconds,
                });
            }
        }

        let now = Utc::now();
        let stored: Option<UsageRecord> = self
            .store
            .get(&usage_key(&caller.caller))
            .await
            .map_err(fail_closed)?;
        let tier = resolve_tier(caller.declared_tier, stored.as_ref(), now);

        match self
            .usage_meter
            .apply(&caller.caller, tier, stored, now)
            .await
            .map_err(fail_closed)?
        {
            UsageDecision::Allowed { remaining, record } => Ok(Admission {
                tier,
                usage: record,
                remaining,
            }),
            UsageDecision::Exceeded { used, limit, .. } => {
                Err(GateError::QuotaExceeded { used, limit })
            }
        }
    }
}

/// Store failures on the admission path deny rather than admit unmetered
/// traffic.
fn fail_closed(error: StoreError) -> GateError {
    tracing::error!(error = %error, "Counter store failure, denying admission");
    GateError::StoreUnavailable
}
