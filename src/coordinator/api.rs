//! Query operations over the tiers.
//!
//! - `contains()` - existence check walking memory, buffer, local, remote
//! - `len()` / `is_empty()` - memory-tier size
//! - `pending_writes()` - write-buffer size
//! - `status()` - where a key currently lives

use super::{KeyStatus, TierStore};

impl TierStore {
    /// Check whether a key exists in any tier.
    ///
    /// Walks the tiers fastest-first and stops at the first hit. A `false`
    /// with an unreachable tier on the way is best-effort, not
    /// authoritative; unavailability reads as absence here just as it reads
    /// as the default in [`get()`](Self::get).
    pub async fn contains(&self, key: &str) -> bool {
        if self.memory.has(key) {
            return true;
        }
        if self.coalescer.lock().contains(key) {
            return true;
        }

        if let Some(ref local) = self.local {
            if matches!(local.get(key).await, Ok(Some(_))) {
                return true;
            }
        }

        if let Some(ref remote) = self.remote {
            if matches!(remote.get(key).await, Ok(Some(_))) {
                return true;
            }
        }

        false
    }

    /// Number of entries in the memory tier.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Check if the memory tier is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Number of writes waiting for the next remote flush.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.coalescer.lock().len()
    }

    /// Report where a key currently lives.
    ///
    /// A key still waiting in the write buffer is `Pending` regardless of
    /// which tiers already hold it. Tier probes are best-effort like
    /// [`contains()`](Self::contains).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use tier_store::{TierStore, KeyStatus};
    /// # async fn example(store: &TierStore) {
    /// match store.status("order.456").await {
    ///     KeyStatus::Pending => println!("queued for remote flush"),
    ///     KeyStatus::Stored { in_memory, in_local, in_remote } => {
    ///         println!("memory={in_memory} local={in_local} remote={in_remote}");
    ///     }
    ///     KeyStatus::Missing => println!("not found"),
    /// }
    /// # }
    /// ```
    pub async fn status(&self, key: &str) -> KeyStatus {
        if self.coalescer.lock().contains(key) {
            return KeyStatus::Pending;
        }

        let in_memory = self.memory.has(key);

        let in_local = match self.local {
            Some(ref local) => matches!(local.get(key).await, Ok(Some(_))),
            None => false,
        };

        let in_remote = match self.remote {
            Some(ref remote) => matches!(remote.get(key).await, Ok(Some(_))),
            None => false,
        };

        if in_memory || in_local || in_remote {
            KeyStatus::Stored {
                in_memory,
                in_local,
                in_remote,
            }
        } else {
            KeyStatus::Missing
        }
    }
}
