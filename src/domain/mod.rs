//! Core domain types for metering and admission

pub mod errors;
pub mod identity;
pub mod records;
pub mod tier;

pub use errors::GateError;
pub use identity::CallerId;
pub use records::{BillingPeriod, RateWindowRecord, UsageRecord};
pub use tier::Tier;
