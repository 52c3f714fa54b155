//! Billing event handling
//!
//! Consumes signed webhook events from the payment provider and updates the
//! caller's tier of record in the counter store, where the next request's
//! tier resolution will observe it. The signature is checked over the raw
//! body before the payload is parsed at all; events are applied as "set tier
//! to X", which absorbs the provider's at-least-once delivery without any
//! replay bookkeeping.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::{CallerId, GateError, Tier, UsageRecord};
use crate::infrastructure::signature::WebhookVerifier;
use crate::infrastructure::store::{CounterStore, usage_key};

/// Billing event payload, parsed only after signature verification.
#[derive(Debug, Deserialize)]
struct BillingEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: BillingEventData,
}

#[derive(Debug, Deserialize)]
struct BillingEventData {
    /// The provider's customer reference, which is the caller identity.
    caller_id: String,
    #[serde(default)]
    tier: Option<Tier>,
}

/// What a verified event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied { caller: CallerId, tier: Tier },
    /// Event types this system does not react to are acknowledged so the
    /// sender stops retrying them.
    Ignored,
}

/// Applies verified billing events to the tier of record.
pub struct BillingEventHandler {
    verifier: WebhookVerifier,
    store: Arc<dyn CounterStore>,
}

impl BillingEventHandler {
    pub fn new(verifier: WebhookVerifier, store: Arc<dyn CounterStore>) -> Self {
        Self { verifier, store }
    }

    /// Verify and apply one raw event. Unverified events are rejected with
    /// no side effect.
    pub async fn handle(
        &self,
        body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, GateError> {
        self.verifier.verify(body, signature_header, Utc::now())?;

        let event: BillingEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                // Authentic but unusable; acknowledging avoids a retry loop
                // the sender can never win.
                tracing::warn!(error = %e, "Discarding unparseable billing event");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let new_tier = match event.event_type.as_str() {
            "subscription.activated" | "subscription.updated" => match event.data.tier {
                Some(tier) => tier,
                None => {
                    tracing::warn!(
                        event_type = %event.event_type,
                        "Subscription event without tier, ignoring"
                    );
                    return Ok(WebhookOutcome::Ignored);
                }
            },
            "subscription.cancelled" | "subscription.deleted" => Tier::Free,
            other => {
                tracing::debug!(event_type = %other, "Ignoring unrecognized billing event");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let caller = CallerId::new(event.data.caller_id);
        self.set_tier(&caller, new_tier).await?;

        tracing::info!(caller = %caller, tier = %new_tier, "Applied billing event");
        Ok(WebhookOutcome::Applied {
            caller,
            tier: new_tier,
        })
    }

    /// Durably record the caller's new tier. Overwrites the tier on the
    /// current usage record, or seeds a fresh current-period record when
    /// none exists; either way a replay lands on the same final state.
    async fn set_tier(&self, caller: &CallerId, tier: Tier) -> Result<(), GateError> {
        let key = usage_key(caller);
        let now = Utc::now();

        let existing: Option<UsageRecord> = self.store.get(&key).await.map_err(|e| {
            tracing::error!(error = %e, "Counter store failure applying billing event");
            GateError::StoreUnavailable
        })?;

        let record = match existing {
            Some(mut record) if record.is_current(now) => {
                record.tier = tier;
                record.last_updated = now;
                record
            }
            _ => UsageRecord::fresh(tier, now),
        };

        self.store.put(&key, &record, None).await.map_err(|e| {
            tracing::error!(error = %e, "Counter store failure applying billing event");
            GateError::StoreUnavailable
        })
    }
}
