//! REST counter store client
//!
//! Client for a networked key-value store exposing `GET /kv/{key}` and
//! `POST /kv/{key}` with an optional `ex` query parameter for the TTL in
//! seconds. Operations run under a bounded timeout and are retried once with
//! a short backoff; anything past that surfaces as a store error and the
//! caller fails closed.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::{CounterStore, StoreError};
use crate::config::StoreConfig;

pub struct RestStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    retry_backoff: Duration,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::unavailable(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/kv/{}", self.base_url, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_once(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let response = self
            .authorize(self.client.get(self.key_url(key)))
            .send()
            .await
            .map_err(classify)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value = response.json().await.map_err(classify)?;
                Ok(Some(value))
            }
            status => Err(StoreError::unavailable(format!(
                "unexpected status {} reading key",
                status
            ))),
        }
    }

    async fn put_once(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let mut request = self.authorize(self.client.post(self.key_url(key))).json(value);
        if let Some(ttl) = ttl {
            request = request.query(&[("ex", ttl.as_secs())]);
        }

        let response = request.send().await.map_err(classify)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::unavailable(format!(
                "unexpected status {} writing key",
                response.status()
            )))
        }
    }
}

fn classify(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::unavailable(error.to_string())
    }
}

#[async_trait]
impl CounterStore for RestStore {
    async fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        match self.get_once(key).await {
            Ok(value) => Ok(value),
            Err(first) => {
                tracing::warn!(error = %first, "Store read failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.get_once(key).await
            }
        }
    }

    async fn put_raw(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        match self.put_once(key, &value, ttl).await {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!(error = %first, "Store write failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.put_once(key, &value, ttl).await
            }
        }
    }
}
