// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for tier-store.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `tier_store_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `tier`: memory, local, remote
//! - `operation`: get, set, refresh, flush
//! - `status`: hit, miss, success, error, superseded

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a tier operation with its outcome
pub fn record_operation(tier: &str, operation: &str, status: &str) {
    counter!(
        "tier_store_operations_total",
        "tier" => tier.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(tier: &str, operation: &str, duration: Duration) {
    histogram!(
        "tier_store_operation_seconds",
        "tier" => tier.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a completed or failed flush attempt
pub fn record_flush(reason: &str, status: &str, count: usize) {
    counter!(
        "tier_store_flushes_total",
        "reason" => reason.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "tier_store_flush_size",
        "reason" => reason.to_string()
    )
    .record(count as f64);
}

/// Record an error with category for alerting
pub fn record_error(tier: &str, operation: &str, error_type: &str) {
    counter!(
        "tier_store_errors_total",
        "tier" => tier.to_string(),
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Set current memory-cache item count
pub fn set_memory_cache_items(count: usize) {
    gauge!("tier_store_memory_cache_items").set(count as f64);
}

/// Set current pending-write buffer size
pub fn set_pending_writes(count: usize) {
    gauge!("tier_store_pending_writes").set(count as f64);
}
