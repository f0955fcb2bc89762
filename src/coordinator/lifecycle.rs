//! Coordinator lifecycle: open, maintenance loop, shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::coalescer::FlushReason;
use crate::storage::http::HttpStore;
use crate::storage::sqlite::SqliteStore;

use super::{StoreState, TierStore};

impl TierStore {
    /// Connect the configured storage collaborators.
    ///
    /// Nothing here is fatal: a local store that fails to open (bad path,
    /// unwritable disk, failed schema init) is logged and skipped, leaving
    /// the coordinator in remote-only mode; an absent remote URL leaves it
    /// device-local. The coordinator always ends up `Ready`.
    #[tracing::instrument(skip(self), fields(has_local, has_remote))]
    pub async fn open(&mut self) {
        info!("opening tier store...");
        let _ = self.state.send(StoreState::Connecting);

        if let Some(ref url) = self.config.local_db_url {
            info!(url = %url, "connecting local store...");
            match SqliteStore::connect(url).await {
                Ok(store) => {
                    self.local = Some(Arc::new(store));
                    tracing::Span::current().record("has_local", true);
                    info!("local store connected");
                }
                Err(e) => {
                    tracing::Span::current().record("has_local", false);
                    warn!(error = %e, "local store failed to open, operating remote-only");
                    crate::metrics::record_error("local", "open", "init");
                }
            }
        } else {
            tracing::Span::current().record("has_local", false);
            info!("no local database configured, operating remote-only");
        }

        if let Some(ref url) = self.config.remote_url {
            let timeout = Duration::from_millis(self.config.remote_timeout_ms);
            match HttpStore::new(url, self.config.remote_token.clone(), timeout) {
                Ok(store) => {
                    self.remote = Some(Arc::new(store));
                    tracing::Span::current().record("has_remote", true);
                    info!(url = %url, "remote store configured");
                }
                Err(e) => {
                    tracing::Span::current().record("has_remote", false);
                    warn!(error = %e, "remote store client failed to build, operating device-local");
                    crate::metrics::record_error("remote", "open", "init");
                }
            }
        } else {
            tracing::Span::current().record("has_remote", false);
            info!("no remote endpoint configured, operating device-local");
        }

        let _ = self.state.send(StoreState::Ready);
        info!("tier store ready");
    }

    /// Perform one maintenance pass: drain the write buffer if a flush
    /// deadline has been reached and refresh the gauges.
    ///
    /// Tests and embedders that want explicit control call this instead of
    /// [`run()`](Self::run).
    pub async fn tick(&self) {
        self.maybe_flush().await;

        crate::metrics::set_memory_cache_items(self.memory.len());
        crate::metrics::set_pending_writes(self.coalescer.lock().len());
    }

    /// Run the maintenance loop until the task is dropped.
    ///
    /// The tick interval only bounds how promptly a due flush is noticed;
    /// the actual flush cadence is governed by the coalescer's quiet-period
    /// and max-wait deadlines.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) {
        let _ = self.state.send(StoreState::Running);
        info!("tier store running");

        let mut tick = tokio::time::interval(Duration::from_millis(self.config.tick_interval_ms));

        loop {
            tick.tick().await;
            self.tick().await;
        }
    }

    /// Initiate graceful shutdown: drain whatever is still buffered.
    ///
    /// Buffered writes that fail to flush here are lost with the process,
    /// the accepted durability trade-off of deferred remote writes.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        info!("shutting down tier store...");
        let _ = self.state.send(StoreState::ShuttingDown);

        let batch = self.coalescer.lock().take_all(FlushReason::Shutdown);
        if let Some(batch) = batch {
            info!(count = batch.entries.len(), "flushing final batch on shutdown");
            self.flush_batch(batch).await;
        }

        info!("tier store shutdown complete");
    }
}
