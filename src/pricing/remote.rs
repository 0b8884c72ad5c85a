//! Durable price store backends.
//!
//! The repository only sees [`RemoteStore`]. Records travel as raw JSON so a
//! backend never needs to know the payload shape of a category.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;

use crate::error::AppError;

use super::models::PriceKey;
use super::requests::PutPricesRequest;
use super::responses::PricesResponse;

/// Durable store for price records
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read a record. `Ok(None)` when nothing was ever saved under `key`.
    async fn fetch(&self, key: &PriceKey) -> Result<Option<serde_json::Value>, AppError>;

    /// Create or overwrite a record
    async fn store(&self, key: &PriceKey, items: serde_json::Value) -> Result<(), AppError>;
}

/// Client for the `/prices` HTTP protocol
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn prices_url(&self) -> String {
        format!("{}/prices", self.base_url)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self, key: &PriceKey) -> Result<Option<serde_json::Value>, AppError> {
        let mut query = vec![
            ("productLine", key.product_line.code().to_string()),
            ("category", key.category.wire_name()),
        ];
        if let Some(tier) = key.tier {
            query.push(("tier", tier.id().to_string()));
        }

        let response = self
            .client
            .get(self.prices_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::RemoteReadFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::RemoteReadFailed(format!("{}: {}", status, text)));
        }

        let body: PricesResponse = response
            .json()
            .await
            .map_err(|e| AppError::RemoteReadFailed(e.to_string()))?;
        Ok(Some(body.items))
    }

    async fn store(&self, key: &PriceKey, items: serde_json::Value) -> Result<(), AppError> {
        let request = PutPricesRequest::for_key(key, items);

        let response = self
            .client
            .put(self.prices_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::RemoteWriteFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::RemoteWriteFailed(format!("{}: {}", status, text)));
        }

        Ok(())
    }
}

/// Process-local store, used when no database is configured and in tests
#[derive(Default)]
pub struct MemoryRemoteStore {
    records: RwLock<HashMap<PriceKey, serde_json::Value>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch(&self, key: &PriceKey) -> Result<Option<serde_json::Value>, AppError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn store(&self, key: &PriceKey, items: serde_json::Value) -> Result<(), AppError> {
        self.records.write().await.insert(*key, items);
        Ok(())
    }
}

/// In-memory store whose next reads can be made to fail
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FlakyRemoteStore {
    inner: MemoryRemoteStore,
    failing_reads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FlakyRemoteStore {
    pub(crate) fn fail_next_reads(&self, count: usize) {
        self.failing_reads
            .store(count, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) async fn raw(&self, key: &PriceKey) -> Option<serde_json::Value> {
        self.inner.fetch(key).await.ok().flatten()
    }
}

#[cfg(test)]
#[async_trait]
impl RemoteStore for FlakyRemoteStore {
    async fn fetch(&self, key: &PriceKey) -> Result<Option<serde_json::Value>, AppError> {
        use std::sync::atomic::Ordering;

        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::RemoteReadFailed("timed out".to_string()));
        }
        self.inner.fetch(key).await
    }

    async fn store(&self, key: &PriceKey, items: serde_json::Value) -> Result<(), AppError> {
        self.inner.store(key, items).await
    }
}
