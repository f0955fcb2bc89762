//! Flush machinery: draining the pending-write buffer to the remote tier.
//!
//! A drained batch either lands in the remote store via one bulk upsert or
//! is restored into the buffer for the next trigger. An atomic in-flight
//! guard keeps concurrent triggers (maintenance tick, manual flush,
//! shutdown) from issuing overlapping flushes.

use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::coalescer::{FlushReason, PendingFlush};

use super::TierStore;

impl TierStore {
    /// Flush the pending buffer if one of its deadlines has been reached.
    ///
    /// Called by the maintenance loop; cheap when nothing is due.
    pub(super) async fn maybe_flush(&self) {
        if self.remote.is_none() {
            // No remote: entries stay buffered, deadlines keep no one waiting
            return;
        }
        if self.flush_in_flight.load(Ordering::Acquire) {
            return;
        }

        let batch = self.coalescer.lock().take_if_due();
        if let Some(batch) = batch {
            self.flush_batch(batch).await;
        }
    }

    /// Flush everything pending right now, regardless of deadlines.
    pub async fn flush(&self) {
        if self.remote.is_none() {
            return;
        }

        let batch = self.coalescer.lock().take_all(FlushReason::Manual);
        if let Some(batch) = batch {
            self.flush_batch(batch).await;
        }
    }

    /// Push one batch to the remote store.
    ///
    /// The buffer was already drained by the caller; on failure (or when the
    /// in-flight guard is held by another flush) the batch goes back into
    /// the buffer, merged under any writes that arrived in the meantime, and
    /// the next trigger retries it.
    pub(super) async fn flush_batch(&self, batch: PendingFlush) {
        let Some(remote) = self.remote.clone() else {
            self.coalescer.lock().restore(batch.entries);
            return;
        };

        if self
            .flush_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(count = batch.entries.len(), "flush already in flight, requeueing batch");
            self.coalescer.lock().restore(batch.entries);
            return;
        }

        let start = Instant::now();
        let count = batch.entries.len();
        debug!(count, reason = %batch.reason, "flushing pending writes");

        match remote.bulk_upsert(&batch.entries).await {
            Ok(written) => {
                info!(written, reason = %batch.reason, "flush complete");
                crate::metrics::record_flush(&batch.reason.to_string(), "success", written);
                crate::metrics::record_latency("remote", "flush", start.elapsed());
            }
            Err(e) => {
                warn!(error = %e, count, reason = %batch.reason, "flush failed, retaining pending writes");
                crate::metrics::record_flush(&batch.reason.to_string(), "error", count);
                crate::metrics::record_error("remote", "flush", "backend");
                self.coalescer.lock().restore(batch.entries);
            }
        }

        self.flush_in_flight.store(false, Ordering::Release);
    }
}
