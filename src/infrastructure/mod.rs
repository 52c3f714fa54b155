//! Infrastructure Layer - External integrations
//!
//! Token verification, webhook signature checking, and the counter store
//! backends live here; everything above this layer talks to traits.

pub mod signature;
pub mod store;
pub mod token;

pub use signature::WebhookVerifier;
pub use store::{CounterStore, MemoryStore, RestStore, StoreError};
pub use token::{TokenVerifier, VerifiedCaller};
