use std::collections::HashMap;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("local store unavailable: {0}")]
    LocalUnavailable(String),
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
}

/// Per-device persistent tier. Survives process restarts, scoped to one
/// device; never shared across devices.
///
/// `Ok(None)` from `get` means the key is genuinely absent, distinct from
/// any value a caller might use as a default. `Err` means the store itself
/// is unavailable; the coordinator degrades rather than propagating it.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Shared durable tier, reachable only over a network call. Last write wins
/// per key.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Apply one upsert per key, keyed by key. Replaying a batch has no
    /// observable effect beyond the first successful application, which is
    /// what makes the coalescer's retry-on-failure policy safe.
    ///
    /// Returns the number of entries applied. A failure means the caller
    /// must treat the batch as not flushed at all.
    async fn bulk_upsert(&self, entries: &HashMap<String, Value>) -> Result<usize, StoreError>;
}
