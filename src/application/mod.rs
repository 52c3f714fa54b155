//! Application Layer - The metering and admission engine
//!
//! Use cases are wired from `Arc<dyn CounterStore>` plus configuration and
//! orchestrated per request by the [`dispatcher`].

pub mod billing;
pub mod dispatcher;
pub mod rate_limiter;
pub mod tier_resolver;
pub mod usage_meter;

pub use billing::{BillingEventHandler, WebhookOutcome};
pub use dispatcher::{Admission, RequestDispatcher};
pub use rate_limiter::{RateDecision, RateLimiter};
pub use tier_resolver::resolve_tier;
pub use usage_meter::{UsageDecision, UsageMeter};
