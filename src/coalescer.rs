// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Write coalescing for batched remote flushes.
//!
//! The [`WriteCoalescer`] merges fine-grained writes into a pending buffer
//! (last write per key wins) and reports a batch as due after a quiet period
//! without new writes, or after a maximum wait since the first unflushed
//! write, whichever comes first.
//!
//! # Example
//!
//! ```
//! use tier_store::{WriteCoalescer, CoalescerConfig};
//! use serde_json::json;
//!
//! let config = CoalescerConfig {
//!     quiet_period_ms: 5_000,
//!     max_wait_ms: 20_000,
//! };
//!
//! let mut coalescer = WriteCoalescer::new(config);
//! assert!(coalescer.is_empty());
//!
//! coalescer.enqueue("user.theme", json!("dark"));
//! coalescer.enqueue("user.theme", json!("light"));
//! assert_eq!(coalescer.len(), 1); // last write wins
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};
use serde_json::Value;
use tracing::debug;

/// Why a batch was drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Quiet period elapsed since the most recent write
    Quiet,
    /// Maximum wait elapsed since the first unflushed write
    MaxWait,
    /// Explicit flush requested
    Manual,
    /// Shutdown drain
    Shutdown,
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::MaxWait => write!(f, "max_wait"),
            Self::Manual => write!(f, "manual"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Timer configuration for the coalescer.
#[derive(Debug, Clone)]
pub struct CoalescerConfig {
    /// A flush becomes due this many milliseconds after the last enqueue
    pub quiet_period_ms: u64,
    /// A flush becomes due no later than this many milliseconds after the
    /// first unflushed enqueue, even under continuous write pressure
    pub max_wait_ms: u64,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 5_000,
            max_wait_ms: 20_000,
        }
    }
}

/// A drained batch ready for a bulk upsert.
#[derive(Debug)]
pub struct PendingFlush {
    pub entries: HashMap<String, Value>,
    pub reason: FlushReason,
}

/// Pending-write buffer with quiet-period and max-wait deadlines.
///
/// Keyed merge: enqueueing a key that is already buffered overwrites the
/// buffered value, so a batch never carries two versions of one key.
pub struct WriteCoalescer {
    config: CoalescerConfig,
    pending: HashMap<String, Value>,
    /// Set on the first enqueue into an empty buffer, cleared on drain
    first_pending_at: Option<Instant>,
    /// Restarted on every enqueue
    last_enqueue_at: Option<Instant>,
}

impl WriteCoalescer {
    pub fn new(config: CoalescerConfig) -> Self {
        Self {
            config,
            pending: HashMap::new(),
            first_pending_at: None,
            last_enqueue_at: None,
        }
    }

    /// Merge a write into the buffer, restarting the quiet-period clock.
    ///
    /// The max-wait clock starts on the first enqueue after a drain and is
    /// not restarted by further enqueues.
    pub fn enqueue(&mut self, key: &str, value: Value) {
        let now = Instant::now();
        if self.first_pending_at.is_none() {
            self.first_pending_at = Some(now);
        }
        self.last_enqueue_at = Some(now);
        self.pending.insert(key.to_string(), value);
    }

    /// Check which deadline, if any, has been reached.
    #[must_use]
    pub fn due_reason(&self) -> Option<FlushReason> {
        if self.pending.is_empty() {
            return None;
        }
        if let Some(first) = self.first_pending_at {
            if first.elapsed() >= Duration::from_millis(self.config.max_wait_ms) {
                return Some(FlushReason::MaxWait);
            }
        }
        if let Some(last) = self.last_enqueue_at {
            if last.elapsed() >= Duration::from_millis(self.config.quiet_period_ms) {
                return Some(FlushReason::Quiet);
            }
        }
        None
    }

    /// Drain the buffer if a deadline has been reached.
    pub fn take_if_due(&mut self) -> Option<PendingFlush> {
        self.due_reason().map(|reason| self.drain(reason))
    }

    /// Drain the buffer unconditionally (manual flush or shutdown).
    pub fn take_all(&mut self, reason: FlushReason) -> Option<PendingFlush> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.drain(reason))
    }

    fn drain(&mut self, reason: FlushReason) -> PendingFlush {
        self.first_pending_at = None;
        self.last_enqueue_at = None;
        let entries = std::mem::take(&mut self.pending);
        debug!(count = entries.len(), %reason, "pending writes drained");
        PendingFlush { entries, reason }
    }

    /// Put a failed batch back without clobbering writes enqueued while the
    /// flush was in flight. Both clocks restart if they are not already
    /// running, so the retained batch is retried after the next quiet period.
    pub fn restore(&mut self, entries: HashMap<String, Value>) {
        for (key, value) in entries {
            self.pending.entry(key).or_insert(value);
        }
        if !self.pending.is_empty() {
            let now = Instant::now();
            if self.first_pending_at.is_none() {
                self.first_pending_at = Some(now);
            }
            if self.last_enqueue_at.is_none() {
                self.last_enqueue_at = Some(now);
            }
        }
    }

    /// Check whether a key is waiting in the buffer.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Age of the oldest unflushed write, if any.
    #[must_use]
    pub fn pending_age(&self) -> Option<Duration> {
        self.first_pending_at.map(|t| t.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    fn coalescer(quiet_ms: u64, max_wait_ms: u64) -> WriteCoalescer {
        WriteCoalescer::new(CoalescerConfig {
            quiet_period_ms: quiet_ms,
            max_wait_ms,
        })
    }

    #[test]
    fn test_empty_initially() {
        let coalescer = WriteCoalescer::new(CoalescerConfig::default());
        assert!(coalescer.is_empty());
        assert_eq!(coalescer.len(), 0);
        assert!(coalescer.due_reason().is_none());
        assert!(coalescer.pending_age().is_none());
    }

    #[test]
    fn test_last_write_wins_per_key() {
        let mut coalescer = coalescer(10_000, 60_000);

        coalescer.enqueue("a", json!(1));
        coalescer.enqueue("a", json!(2));
        coalescer.enqueue("a", json!(3));
        coalescer.enqueue("b", json!("x"));

        assert_eq!(coalescer.len(), 2);

        let batch = coalescer.take_all(FlushReason::Manual).unwrap();
        assert_eq!(batch.entries["a"], json!(3));
        assert_eq!(batch.entries["b"], json!("x"));
    }

    #[test]
    fn test_not_due_within_quiet_period() {
        let mut coalescer = coalescer(10_000, 60_000);
        coalescer.enqueue("a", json!(1));

        assert!(coalescer.due_reason().is_none());
        assert!(coalescer.take_if_due().is_none());
        assert_eq!(coalescer.len(), 1);
    }

    #[test]
    fn test_due_after_quiet_period() {
        let mut coalescer = coalescer(10, 60_000);
        coalescer.enqueue("a", json!(1));

        sleep(Duration::from_millis(20));

        assert_eq!(coalescer.due_reason(), Some(FlushReason::Quiet));
        let batch = coalescer.take_if_due().unwrap();
        assert_eq!(batch.reason, FlushReason::Quiet);
        assert_eq!(batch.entries.len(), 1);
        assert!(coalescer.is_empty());
    }

    #[test]
    fn test_enqueue_resets_quiet_clock() {
        let mut coalescer = coalescer(100, 60_000);
        coalescer.enqueue("a", json!(1));

        sleep(Duration::from_millis(60));
        coalescer.enqueue("b", json!(2));
        sleep(Duration::from_millis(60));

        // 120ms since the first enqueue but only 60ms since the last one
        assert!(coalescer.due_reason().is_none());

        sleep(Duration::from_millis(60));
        assert_eq!(coalescer.due_reason(), Some(FlushReason::Quiet));
    }

    #[test]
    fn test_max_wait_fires_under_continuous_writes() {
        let mut coalescer = coalescer(50, 80);
        coalescer.enqueue("k0", json!(0));

        // Keep enqueueing faster than the quiet period
        for i in 1..6 {
            sleep(Duration::from_millis(20));
            coalescer.enqueue(&format!("k{i}"), json!(i));
        }

        // 100ms elapsed since the first enqueue, past the 80ms max wait
        assert_eq!(coalescer.due_reason(), Some(FlushReason::MaxWait));
        let batch = coalescer.take_if_due().unwrap();
        assert_eq!(batch.reason, FlushReason::MaxWait);
        assert_eq!(batch.entries.len(), 6);
    }

    #[test]
    fn test_drain_resets_both_clocks() {
        let mut coalescer = coalescer(10, 40);
        coalescer.enqueue("a", json!(1));
        sleep(Duration::from_millis(20));

        assert!(coalescer.take_if_due().is_some());

        // A new enqueue starts a fresh cycle, nothing is immediately due
        coalescer.enqueue("b", json!(2));
        assert!(coalescer.due_reason().is_none());
    }

    #[test]
    fn test_take_all_reasons() {
        let mut coalescer = coalescer(10_000, 60_000);

        assert!(coalescer.take_all(FlushReason::Manual).is_none());

        coalescer.enqueue("a", json!(1));
        let batch = coalescer.take_all(FlushReason::Shutdown).unwrap();
        assert_eq!(batch.reason, FlushReason::Shutdown);
        assert!(coalescer.is_empty());
    }

    #[test]
    fn test_restore_keeps_newer_writes() {
        let mut coalescer = coalescer(10_000, 60_000);
        coalescer.enqueue("a", json!("old"));
        coalescer.enqueue("b", json!("only-in-batch"));

        let batch = coalescer.take_all(FlushReason::Manual).unwrap();

        // A newer write lands while the flush is in flight
        coalescer.enqueue("a", json!("new"));

        coalescer.restore(batch.entries);

        assert_eq!(coalescer.len(), 2);
        let retried = coalescer.take_all(FlushReason::Manual).unwrap();
        assert_eq!(retried.entries["a"], json!("new"));
        assert_eq!(retried.entries["b"], json!("only-in-batch"));
    }

    #[test]
    fn test_restore_restarts_clocks() {
        let mut coalescer = coalescer(10, 60_000);
        coalescer.enqueue("a", json!(1));
        sleep(Duration::from_millis(20));

        let batch = coalescer.take_if_due().unwrap();
        coalescer.restore(batch.entries);

        // Retained batch is not immediately due again
        assert!(coalescer.due_reason().is_none());
        sleep(Duration::from_millis(20));
        assert_eq!(coalescer.due_reason(), Some(FlushReason::Quiet));
    }

    #[test]
    fn test_contains() {
        let mut coalescer = coalescer(10_000, 60_000);
        assert!(!coalescer.contains("a"));

        coalescer.enqueue("a", json!(1));
        assert!(coalescer.contains("a"));
        assert!(!coalescer.contains("b"));

        coalescer.take_all(FlushReason::Manual);
        assert!(!coalescer.contains("a"));
    }

    #[test]
    fn test_flush_reason_display() {
        assert_eq!(format!("{}", FlushReason::Quiet), "quiet");
        assert_eq!(format!("{}", FlushReason::MaxWait), "max_wait");
        assert_eq!(format!("{}", FlushReason::Manual), "manual");
        assert_eq!(format!("{}", FlushReason::Shutdown), "shutdown");
    }
}
