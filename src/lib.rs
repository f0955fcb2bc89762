//! # Tier Store
//!
//! A three-tier key/value store that serves reads from the fastest tier that
//! has an answer and keeps the durable tier eventually consistent with
//! coalesced batch writes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Memory Cache                           │
//! │  • Synchronous in-process map (DashMap)                    │
//! │  • Cleared on process restart                              │
//! │  • A hit here is trusted current, no I/O                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                       (miss: read through)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Local Store (SQLite)                       │
//! │  • Per-device persistence, survives restarts               │
//! │  • Hit returns immediately, then a deferred remote         │
//! │    refresh revalidates the entry in the background         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                       (miss: fetch and seed)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Remote Store (HTTP)                        │
//! │  • Shared durable archive, last-write-wins                 │
//! │  • Written in coalesced batches via bulk upsert            │
//! │  • Unreachable remote degrades reads to the caller default │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes update the memory cache synchronously, persist to the local store
//! without blocking the caller, and are buffered in the [`WriteCoalescer`]
//! until a quiet period or the maximum wait elapses, whichever comes first.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tier_store::{TierStore, StoreConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig {
//!         local_db_url: Some("sqlite:tier_store.db".into()),
//!         remote_url: Some("https://kv.example.com/api/store".into()),
//!         ..Default::default()
//!     };
//!
//!     let mut store = TierStore::new(config);
//!     store.open().await;
//!
//!     // Immediate in memory and local, batched to the remote
//!     store.set("settings.theme", json!({"mode": "dark"}));
//!
//!     // Memory hit: no I/O
//!     let theme = store.get("settings.theme", json!(null)).await;
//!     println!("{theme}");
//!
//!     // Drain what is still buffered before exit
//!     store.shutdown().await;
//! }
//! ```
//!
//! ## Failure policy
//!
//! The public `get`/`set` operations never fail. A read whose tiers are all
//! unreachable resolves to the caller-supplied default; a write whose remote
//! flush fails stays buffered and is retried on the next trigger. Buffered
//! writes that never flush before the process exits are lost; call
//! [`TierStore::shutdown`] for a final drain.
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`TierStore`] orchestrating the three tiers
//! - [`coalescer`]: pending-write buffer with quiet-period/max-wait flush
//! - [`storage`]: tier collaborators (memory, SQLite, HTTP) and their traits
//! - [`retry`]: bounded backoff for collaborator startup connections
//! - [`metrics`]: `metrics`-facade instrumentation helpers

pub mod coalescer;
pub mod config;
pub mod coordinator;
pub mod metrics;
pub mod retry;
pub mod storage;

pub use coalescer::{CoalescerConfig, FlushReason, PendingFlush, WriteCoalescer};
pub use config::StoreConfig;
pub use coordinator::{KeyStatus, StoreState, TierStore};
pub use retry::RetryConfig;
pub use storage::http::HttpStore;
pub use storage::memory::MemoryCache;
pub use storage::sqlite::SqliteStore;
pub use storage::traits::{LocalStore, RemoteStore, StoreError};
