//! Per-caller counter records held in the counter store
//!
//! Both record types are keyed exclusively by caller identity and live in
//! distinct key namespaces so the rate policy and the quota policy can never
//! couple accidentally, even though they share a physical store.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::tier::Tier;

/// A calendar-month billing window `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// The period containing `now`: first day of the current month up to
    /// (exclusive) the first day of the next month, both UTC.
    pub fn containing(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let start = first_of_month(today.year(), today.month());
        let end = if today.month() == 12 {
            first_of_month(today.year() + 1, 1)
        } else {
            first_of_month(today.year(), today.month() + 1)
        };
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Day 1 exists in every month; the unwrap cannot fire for valid input.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// Short-window request counter for one caller.
///
/// Created on the first request in a window and superseded, never merged,
/// when a new window begins. Stored with a TTL slightly longer than the
/// window so stale entries self-clean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateWindowRecord {
    pub count: u64,
    pub window_start: DateTime<Utc>,
}

impl RateWindowRecord {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Whole seconds elapsed since the window opened (clamped at zero for
    /// clock skew between writers).
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now - self.window_start).num_seconds().max(0) as u64
    }

    /// Whether this window is still the active one for the given length.
    pub fn is_active(&self, now: DateTime<Utc>, window_seconds: u64) -> bool {
        self.elapsed_seconds(now) < window_seconds
    }
}

/// Monthly usage counter for one caller.
///
/// Exactly one usage record exists per caller; rollover replaces a stale
/// record with a zeroed one for the current period. The `tier` field is the
/// tier of record: billing events overwrite it, and a current record's tier
/// takes precedence over the token's declared tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub usage_count: u64,
    pub tier: Tier,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub last_updated: DateTime<Utc>,
}

impl UsageRecord {
    /// A zeroed record spanning the billing period containing `now`.
    pub fn fresh(tier: Tier, now: DateTime<Utc>) -> Self {
        let period = BillingPeriod::containing(now);
        Self {
            usage_count: 0,
            tier,
            period_start: period.start,
            period_end: period.end,
            last_updated: now,
        }
    }

    /// A record is current only while `period_start <= today < period_end`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        self.period_start <= today && today < self.period_end
    }
}
