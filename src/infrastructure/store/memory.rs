//! In-memory counter store
//!
//! Single-process backend used for development and tests. Entries carry an
//! optional expiry checked lazily on read, mirroring the TTL semantics of
//! the networked backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{CounterStore, StoreError};

#[derive(Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}

/// In-memory key-value store with per-key expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries. The store also ignores expired entries on read,
    /// so this only reclaims memory.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn put_raw(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_records() {
        let store = MemoryStore::new();
        store
            .put_raw("usage:a", serde_json::json!({"usage_count": 3}), None)
            .await
            .unwrap();

        let value = store.get_raw("usage:a").await.unwrap().unwrap();
        assert_eq!(value["usage_count"], 3);
        assert!(store.get_raw("usage:b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store
            .put_raw(
                "rate:a",
                serde_json::json!({"count": 1}),
                Some(Duration::from_millis(10)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.get_raw("rate:a").await.unwrap().is_none());
        assert_eq!(store.cleanup_expired().await, 1);
    }
}
