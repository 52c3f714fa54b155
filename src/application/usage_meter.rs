//! Monthly usage metering with calendar rollover
//!
//! Caps cumulative requests per caller over a calendar-month billing period.
//! A stale record is replaced by a zeroed record for the current month
//! before any check; the reset target is identical regardless of which of
//! two racing writers wins, so rollover needs no compare-and-swap to stay
//! idempotent. Like the rate limiter, the increment itself is a non-atomic
//! read-then-write with bounded overshoot.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::QuotaConfig;
use crate::domain::{CallerId, Tier, UsageRecord};
use crate::infrastructure::store::{CounterStore, StoreError, usage_key};

/// Outcome of a usage check.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageDecision {
    Allowed {
        /// Requests left this period; `None` for unlimited tiers.
        remaining: Option<u64>,
        record: UsageRecord,
    },
    Exceeded {
        used: u64,
        limit: u64,
        record: UsageRecord,
    },
}

/// Per-caller monthly usage meter backed by the counter store.
pub struct UsageMeter {
    store: Arc<dyn CounterStore>,
    config: QuotaConfig,
}

impl UsageMeter {
    pub fn new(store: Arc<dyn CounterStore>, config: QuotaConfig) -> Self {
        Self { store, config }
    }

    /// Check the caller's quota for the resolved tier and consume one
    /// request if admitted.
    pub async fn check_and_increment(
        &self,
        caller: &CallerId,
        tier: Tier,
    ) -> Result<UsageDecision, StoreError> {
        let existing = self.store.get(&usage_key(caller)).await?;
        self.apply(caller, tier, existing, Utc::now()).await
    }

    /// Same as [`check_and_increment`](Self::check_and_increment) but with
    /// the usage record already loaded, so the dispatcher can reuse the read
    /// it performed for tier resolution.
    pub async fn apply(
        &self,
        caller: &CallerId,
        tier: Tier,
        existing: Option<UsageRecord>,
        now: DateTime<Utc>,
    ) -> Result<UsageDecision, StoreError> {
        let key = usage_key(caller);

        let mut record = match existing {
            Some(record) if record.is_current(now) => record,
            stale => {
                // Rollover: replace the stale record with a zeroed one for
                // the current period, seeded with the resolved tier.
                if let Some(stale) = &stale {
                    tracing::info!(
                        caller = %caller,
                        old_period_end = %stale.period_end,
                        "Rolling usage record over to the current period"
                    );
                }
                let fresh = UsageRecord::fresh(tier, now);
                self.store.put(&key, &fresh, None).await?;
                fresh
            }
        };

        // Unlimited tiers are still counted for observability but never
        // blocked.
        let limit = match record.tier.monthly_limit(self.config.free_monthly_limit) {
            Some(limit) if record.usage_count >= limit => {
                tracing::debug!(caller = %caller, used = record.usage_count, limit, "Quota exhausted");
                return Ok(UsageDecision::Exceeded {
                    used: record.usage_count,
                    limit,
                    record,
                });
            }
            limit => limit,
        };

        record.usage_count += 1;
        record.last_updated = now;
        self.store.put(&key, &record, None).await?;

        Ok(UsageDecision::Allowed {
            remaining: limit.map(|limit| limit - record.usage_count),
            record,
        })
    }

    /// Read-only view of the caller's current-period usage for display. A
    /// missing or stale record is presented as a zeroed current-month record
    /// without writing anything back.
    pub async fn current_view(
        &self,
        caller: &CallerId,
        declared_tier: Tier,
    ) -> Result<UsageRecord, StoreError> {
        let now = Utc::now();
        let existing: Option<UsageRecord> = self.store.get(&usage_key(caller)).await?;
        Ok(match existing {
            Some(record) if record.is_current(now) => record,
            _ => UsageRecord::fresh(declared_tier, now),
        })
    }

    pub fn free_monthly_limit(&self) -> u64 {
        self.config.free_monthly_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::MemoryStore;
    use chrono::TimeZone;

    fn meter(store: Arc<dyn CounterStore>) -> UsageMeter {
        UsageMeter::new(
            store,
            QuotaConfig {
                free_monthly_limit: 5,
            },
        )
    }

    fn march() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
    }

    fn april_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn free_tier_denied_past_quota() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::new());
        let meter = meter(store.clone());
        let caller = CallerId::new("caller-1");

        for expected_remaining in [4, 3, 2, 1, 0] {
            let existing = store.get(&usage_key(&caller)).await.unwrap();
            match meter
                .apply(&caller, Tier::Free, existing, march())
                .await
                .unwrap()
            {
                UsageDecision::Allowed { remaining, .. } => {
                    assert_eq!(remaining, Some(expected_remaining))
                }
                other => panic!("expected allowed, got {:?}", other),
            }
        }

        let existing = store.get(&usage_key(&caller)).await.unwrap();
        match meter
            .apply(&caller, Tier::Free, existing, march())
            .await
            .unwrap()
        {
            UsageDecision::Exceeded { used, limit, .. } => {
                assert_eq!((used, limit), (5, 5));
            }
            other => panic!("expected exceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn pro_tier_counts_but_never_blocks() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::new());
        let meter = meter(store.clone());
        let caller = CallerId::new("caller-1");

        for _ in 0..20 {
            let existing = store.get(&usage_key(&caller)).await.unwrap();
            match meter
                .apply(&caller, Tier::Pro, existing, march())
                .await
                .unwrap()
            {
                UsageDecision::Allowed { remaining, .. } => assert_eq!(remaining, None),
                other => panic!("expected allowed, got {:?}", other),
            }
        }

        let record: UsageRecord = store
            .get(&usage_key(&caller))
            .await
            .unwrap()
            .expect("record written");
        assert_eq!(record.usage_count, 20);
    }

    #[tokio::test]
    async fn stale_record_rolls_over_to_new_month() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::new());
        let meter = meter(store.clone());
        let caller = CallerId::new("caller-1");

        let mut exhausted = UsageRecord::fresh(Tier::Free, march());
        exhausted.usage_count = 5;
        store
            .put(&usage_key(&caller), &exhausted, None)
            .await
            .unwrap();

        let existing = store.get(&usage_key(&caller)).await.unwrap();
        match meter
            .apply(&caller, Tier::Free, existing, april_first())
            .await
            .unwrap()
        {
            UsageDecision::Allowed { remaining, record } => {
                assert_eq!(remaining, Some(4));
                assert_eq!(record.usage_count, 1);
                assert_eq!(
                    record.period_start,
                    chrono::NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
                );
                assert_eq!(
                    record.period_end,
                    chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
                );
            }
            other => panic!("expected allowed after rollover, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn concurrent_rollover_converges() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::new());
        let meter = meter(store.clone());
        let caller = CallerId::new("caller-1");

        let mut stale = UsageRecord::fresh(Tier::Free, march());
        stale.usage_count = 5;
        store.put(&usage_key(&caller), &stale, None).await.unwrap();

        // Both writers observed the same stale record; both reset to the
        // identical new-period shape, so the surviving record is sane
        // whichever write lands last.
        let snapshot: Option<UsageRecord> = store.get(&usage_key(&caller)).await.unwrap();
        meter
            .apply(&caller, Tier::Free, snapshot.clone(), april_first())
            .await
            .unwrap();
        meter
            .apply(&caller, Tier::Free, snapshot, april_first())
            .await
            .unwrap();

        let record: UsageRecord = store
            .get(&usage_key(&caller))
            .await
            .unwrap()
            .expect("record written");
        assert!(record.usage_count <= 2);
        assert_eq!(
            record.period_start,
            chrono::NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn view_does_not_write() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::new());
        let meter = meter(store.clone());
        let caller = CallerId::new("caller-1");

        let view = meter.current_view(&caller, Tier::Free).await.unwrap();
        assert_eq!(view.usage_count, 0);
        assert_eq!(view.tier, Tier::Free);

        let stored: Option<UsageRecord> = store.get(&usage_key(&caller)).await.unwrap();
        assert!(stored.is_none());
    }
}
