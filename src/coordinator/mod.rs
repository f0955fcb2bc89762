// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tier-store coordinator.
//!
//! The [`TierStore`] orchestrates the three storage tiers:
//! - Memory cache: synchronous, trusted current, no I/O
//! - Local store: per-device SQLite, answers misses fast, triggers a
//!   background remote refresh (stale-while-revalidate)
//! - Remote store: shared HTTP archive, written in coalesced batches
//!
//! # Lifecycle
//!
//! ```text
//! Created → Connecting → Ready → Running → ShuttingDown
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tier_store::{TierStore, StoreConfig, StoreState};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut store = TierStore::new(StoreConfig::default());
//! assert_eq!(store.state(), StoreState::Created);
//!
//! store.open().await;
//! store.set("greeting", json!("hello"));
//! assert_eq!(store.get("greeting", json!(null)).await, json!("hello"));
//! # }
//! ```

mod api;
mod flush;
mod lifecycle;
mod types;

pub use types::{KeyStatus, StoreState};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::coalescer::{CoalescerConfig, WriteCoalescer};
use crate::config::StoreConfig;
use crate::storage::memory::MemoryCache;
use crate::storage::traits::{LocalStore, RemoteStore};

/// Coordinator for the three-tier store.
///
/// Reads prefer the freshest available tier without blocking on a slower one
/// when a faster tier already has an answer; writes are immediately durable
/// on this device and eventually durable on the remote. The public `get` and
/// `set` never fail: unreachable tiers degrade to the caller's default
/// (reads) or to buffered retry (writes).
///
/// All state lives in this instance. Two coordinators share nothing, not
/// even when they point at the same backing stores.
///
/// # Runtime
///
/// `set` spawns the non-blocking local write onto the ambient Tokio runtime,
/// so the coordinator must live inside one.
pub struct TierStore {
    pub(super) config: StoreConfig,

    /// Lifecycle state (broadcast to watchers)
    pub(super) state: watch::Sender<StoreState>,
    pub(super) state_rx: watch::Receiver<StoreState>,

    /// Fastest tier: in-process map
    pub(super) memory: Arc<MemoryCache>,

    /// Per-device persistent tier; `None` means remote-only mode
    pub(super) local: Option<Arc<dyn LocalStore>>,

    /// Shared durable tier; `None` means device-local mode
    pub(super) remote: Option<Arc<dyn RemoteStore>>,

    /// Pending-write buffer. The mutex is never held across an await.
    pub(super) coalescer: Arc<Mutex<WriteCoalescer>>,

    /// Monotonic write counter backing the memory-slot versions that guard
    /// background refreshes against clobbering newer writes
    pub(super) write_seq: Arc<AtomicU64>,

    /// Guard ensuring exactly one flush executes per logical batch
    pub(super) flush_in_flight: Arc<AtomicBool>,
}

impl TierStore {
    /// Create a coordinator with empty memory cache and write buffer.
    ///
    /// The store starts in `Created` state with no collaborators attached.
    /// Call [`open()`](Self::open) to connect them, or
    /// [`with_stores()`](Self::with_stores) to inject them directly.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_stores(config, None, None)
    }

    /// Create a coordinator over explicit collaborators.
    ///
    /// `None` for the local store means remote-only mode; `None` for the
    /// remote store means device-local mode (reads stop at the local tier,
    /// buffered writes are held until a remote appears, i.e. never).
    pub fn with_stores(
        config: StoreConfig,
        local: Option<Arc<dyn LocalStore>>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(StoreState::Created);

        let coalescer = WriteCoalescer::new(CoalescerConfig {
            quiet_period_ms: config.quiet_period_ms,
            max_wait_ms: config.max_wait_ms,
        });

        Self {
            config,
            state: state_tx,
            state_rx,
            memory: Arc::new(MemoryCache::new()),
            local,
            remote,
            coalescer: Arc::new(Mutex::new(coalescer)),
            write_seq: Arc::new(AtomicU64::new(0)),
            flush_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StoreState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<StoreState> {
        self.state_rx.clone()
    }

    // --- Write path ---

    /// Write a value.
    ///
    /// The memory cache is updated before this returns, so an immediately
    /// following `get` sees the new value with no I/O. The local write runs
    /// without blocking the caller (failures are logged, a later read just
    /// misses locally and falls through to the remote). The remote write is
    /// deferred into the coalescer; nothing here waits on the network.
    pub fn set(&self, key: &str, value: Value) {
        let start = Instant::now();

        if let Some(local) = self.local.clone() {
            let key = key.to_string();
            let value = value.clone();
            tokio::spawn(async move {
                if let Err(e) = local.set(&key, &value).await {
                    warn!(key = %key, error = %e, "local write failed");
                    crate::metrics::record_error("local", "set", "backend");
                }
            });
        }

        let version = self.next_version();
        self.memory.set(key, value.clone(), version);
        self.coalescer.lock().enqueue(key, value);

        debug!(key = %key, "write applied to memory, queued for remote");
        crate::metrics::record_operation("memory", "set", "success");
        crate::metrics::record_latency("memory", "set", start.elapsed());
    }

    // --- Read path ---

    /// Read a value, resolving to `default` when no tier has an answer.
    ///
    /// Memory hit: returned immediately, no I/O. Local hit: returned
    /// immediately, then a deferred remote refresh revalidates the entry for
    /// future reads. Local miss: fetched from the remote, seeded into the
    /// faster tiers. Every failure on the way degrades to `default`; this
    /// call never errors, which also means a caller cannot tell "stored
    /// value equals default" from "all tiers failed".
    #[tracing::instrument(skip(self, default), fields(tier))]
    pub async fn get(&self, key: &str, default: Value) -> Value {
        let start = Instant::now();

        if let Some(value) = self.memory.get(key) {
            tracing::Span::current().record("tier", "memory");
            debug!("memory hit");
            crate::metrics::record_operation("memory", "get", "hit");
            crate::metrics::record_latency("memory", "get", start.elapsed());
            return value;
        }

        self.get_local(key, default, start).await
    }

    /// Local leg of the read path.
    async fn get_local(&self, key: &str, default: Value, start: Instant) -> Value {
        if let Some(ref local) = self.local {
            match local.get(key).await {
                Ok(Some(value)) => {
                    let version = self.next_version();
                    self.memory.set(key, value.clone(), version);
                    self.schedule_refresh(key, version);

                    tracing::Span::current().record("tier", "local");
                    debug!("local hit, remote refresh scheduled");
                    crate::metrics::record_operation("local", "get", "hit");
                    crate::metrics::record_latency("local", "get", start.elapsed());
                    return value;
                }
                Ok(None) => {
                    debug!("local miss");
                    crate::metrics::record_operation("local", "get", "miss");
                }
                Err(e) => {
                    warn!(error = %e, "local read failed");
                    crate::metrics::record_operation("local", "get", "error");
                    crate::metrics::record_error("local", "get", "backend");
                }
            }
        }

        self.get_remote(key, default, start).await
    }

    /// Remote leg of the read path.
    async fn get_remote(&self, key: &str, default: Value, start: Instant) -> Value {
        let Some(ref remote) = self.remote else {
            tracing::Span::current().record("tier", "default");
            debug!("no remote configured, resolving to default");
            return default;
        };

        match remote.get(key).await {
            Ok(Some(value)) => {
                let version = self.next_version();
                self.memory.set(key, value.clone(), version);
                self.seed_local(key, &value);

                tracing::Span::current().record("tier", "remote");
                debug!("remote hit, seeded faster tiers");
                crate::metrics::record_operation("remote", "get", "hit");
                crate::metrics::record_latency("remote", "get", start.elapsed());
                value
            }
            Ok(None) => {
                tracing::Span::current().record("tier", "default");
                debug!("remote has no entry, resolving to default");
                crate::metrics::record_operation("remote", "get", "miss");
                default
            }
            Err(e) => {
                tracing::Span::current().record("tier", "default");
                warn!(error = %e, "remote read failed, resolving to default");
                crate::metrics::record_operation("remote", "get", "error");
                crate::metrics::record_error("remote", "get", "backend");
                default
            }
        }
    }

    // --- Internal helpers ---

    pub(super) fn next_version(&self) -> u64 {
        self.write_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Write a remote value into the local store without holding up the
    /// read that fetched it.
    fn seed_local(&self, key: &str, value: &Value) {
        let Some(local) = self.local.clone() else {
            return;
        };
        let key = key.to_string();
        let value = value.clone();
        tokio::spawn(async move {
            if let Err(e) = local.set(&key, &value).await {
                warn!(key = %key, error = %e, "seeding local store failed");
                crate::metrics::record_error("local", "set", "backend");
            }
        });
    }

    /// Schedule the one-shot remote refresh that follows a local hit.
    ///
    /// The refresh sleeps for the configured delay, fetches the key from the
    /// remote, and overwrites the memory cache and local store with whatever
    /// it finds. `scheduled_version` is the memory-slot version written by
    /// the local hit: if the slot changed by the time the refresh resolves
    /// (a newer `set`, or a competing read already refreshed it), the stale
    /// result is discarded instead of applied.
    fn schedule_refresh(&self, key: &str, scheduled_version: u64) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let memory = self.memory.clone();
        let local = self.local.clone();
        let write_seq = self.write_seq.clone();
        let delay = Duration::from_millis(self.config.refresh_delay_ms);
        let key = key.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match remote.get(&key).await {
                Ok(Some(value)) => {
                    if memory.version(&key) != Some(scheduled_version) {
                        debug!(key = %key, "refresh superseded by a newer write, discarding");
                        crate::metrics::record_operation("remote", "refresh", "superseded");
                        return;
                    }

                    let version = write_seq.fetch_add(1, Ordering::Relaxed) + 1;
                    memory.set(&key, value.clone(), version);

                    if let Some(local) = local {
                        if let Err(e) = local.set(&key, &value).await {
                            warn!(key = %key, error = %e, "refresh write to local store failed");
                            crate::metrics::record_error("local", "set", "backend");
                        }
                    }

                    debug!(key = %key, "background refresh applied");
                    crate::metrics::record_operation("remote", "refresh", "success");
                }
                Ok(None) => {
                    // Remote has nothing newer; the local value stands
                    debug!(key = %key, "remote has no entry, keeping local value");
                    crate::metrics::record_operation("remote", "refresh", "miss");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "background refresh failed");
                    crate::metrics::record_operation("remote", "refresh", "error");
                    crate::metrics::record_error("remote", "refresh", "backend");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device_local_store() -> TierStore {
        TierStore::new(StoreConfig::default())
    }

    #[tokio::test]
    async fn test_created_state() {
        let store = device_local_store();
        assert_eq!(store.state(), StoreState::Created);
    }

    #[tokio::test]
    async fn test_set_then_get_is_a_memory_hit() {
        let store = device_local_store();

        store.set("user.name", json!("alice"));

        let value = store.get("user.name", json!("fallback")).await;
        assert_eq!(value, json!("alice"));
    }

    #[tokio::test]
    async fn test_get_absent_resolves_default() {
        let store = device_local_store();

        let value = store.get("missing", json!({"d": true})).await;
        assert_eq!(value, json!({"d": true}));

        // The default is not cached anywhere
        assert!(!store.memory.has("missing"));
    }

    #[tokio::test]
    async fn test_writes_apply_in_caller_order() {
        let store = device_local_store();

        store.set("k", json!(1));
        store.set("k", json!(2));
        store.set("k", json!(3));

        assert_eq!(store.get("k", json!(null)).await, json!(3));
        assert_eq!(store.memory.version("k"), Some(3));
    }

    #[tokio::test]
    async fn test_set_queues_for_remote() {
        let store = device_local_store();

        store.set("a", json!(1));
        store.set("b", json!(2));
        store.set("a", json!(3));

        let coalescer = store.coalescer.lock();
        assert_eq!(coalescer.len(), 2);
        assert!(coalescer.contains("a"));
        assert!(coalescer.contains("b"));
    }

    #[tokio::test]
    async fn test_instances_share_nothing() {
        let a = device_local_store();
        let b = device_local_store();

        a.set("k", json!("from-a"));

        assert_eq!(b.get("k", json!("unset")).await, json!("unset"));
        assert!(b.coalescer.lock().is_empty());
    }
}
