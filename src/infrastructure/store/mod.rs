//! Counter store abstraction
//!
//! The store is an eventually consistent key-value service: a write is not
//! guaranteed visible to a racing read on the same key, there are no
//! transactions, and read-modify-write sequences built on top of it can
//! overshoot by at most the number of concurrently in-flight requests for a
//! caller. The limiter and meter are designed around that bound rather than
//! pretending it away.
//!
//! Rate and usage records share a physical store but live in distinct key
//! namespaces (`rate:` / `usage:`) so the two policies cannot couple.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::domain::CallerId;

/// Key for a caller's short-window rate record.
pub fn rate_key(caller: &CallerId) -> String {
    format!("rate:{}", caller)
}

/// Key for a caller's monthly usage record.
pub fn usage_key(caller: &CallerId) -> String {
    format!("usage:{}", caller)
}

/// Counter store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store operation timed out")]
    Timeout,

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Key-value store holding small JSON records with optional per-key expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn put_raw(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;
}

impl dyn CounterStore {
    /// Read and deserialize one record.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and write one record, optionally with a TTL.
    pub async fn put<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.put_raw(key, value, ttl).await
    }
}
