//! Metergate - Tier-aware metering gateway
//!
//! A stateless edge API that authenticates callers, rate limits them over a
//! short fixed window, meters monthly usage against their subscription tier,
//! and keeps the tier of record current from signed billing events. All
//! state lives in a pluggable counter store.

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

pub use app::{AppHandle, create_app};
pub use config::Config;
pub use logging::init_tracing;
