//! Effective-tier resolution
//!
//! The token's tier claim is only as fresh as the token itself, while the
//! store-held tier reflects the most recent billing event. A current stored
//! record therefore wins; this is the mechanism by which an upgrade or
//! downgrade becomes effective without forcing the caller to re-authenticate.

use chrono::{DateTime, Utc};

use crate::domain::{Tier, UsageRecord};

/// Combine the token's declared tier with the store-held record into the
/// tier used for admission. A stale record carries a tier from a past
/// period and is ignored; the declared tier then seeds the next rollover.
pub fn resolve_tier(
    declared: Tier,
    stored: Option<&UsageRecord>,
    now: DateTime<Utc>,
) -> Tier {
    match stored {
        Some(record) if record.is_current(now) => record.tier,
        _ => declared,
    }
}
