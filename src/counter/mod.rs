//! Shared write buffer for per-project, per-day visit counters.
//!
//! Every operation is atomic with respect to concurrent callers. `increment`
//! and `add_to_set` (re)apply the store's key TTL in the same step, so a key
//! that keeps receiving visits never expires mid-day.

pub mod keys;
pub mod memory;
pub mod redis_store;

use crate::config::{CounterBackend, CounterStoreConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("key {0} holds a value of the wrong type")]
    WrongType(String),

    #[error("counter store operation timed out")]
    Timeout,
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add one to the integer at `key` and return the new value.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Add `member` to the set at `key`.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Set the time-to-live of an existing key. Missing keys are ignored.
    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Integer value at `key`, 0 if absent.
    async fn get_value(&self, key: &str) -> Result<i64, StoreError>;

    /// Cardinality of the set at `key`, 0 if absent.
    async fn get_set_size(&self, key: &str) -> Result<i64, StoreError>;

    /// All live keys starting with `prefix`.
    async fn list_keys_matching(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedCounterStore = Arc<dyn CounterStore>;

/// Build the configured backend.
pub async fn connect(config: &CounterStoreConfig) -> Result<SharedCounterStore, StoreError> {
    let ttl = Duration::from_secs(config.key_ttl_secs);
    match config.backend {
        CounterBackend::Memory => {
            tracing::info!(max_keys = config.max_keys, "using in-memory counter store");
            Ok(Arc::new(memory::MemoryCounterStore::new(
                config.max_keys,
                ttl,
            )))
        }
        CounterBackend::Redis => {
            let url = config.redis_url.as_deref().unwrap_or_default();
            let store = redis_store::RedisCounterStore::connect(url, ttl).await?;
            tracing::info!("using redis counter store");
            Ok(Arc::new(store))
        }
    }
}

/// Run a store operation with an upper bound on its latency.
pub async fn bounded<T, F>(limit: Duration, op: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}
