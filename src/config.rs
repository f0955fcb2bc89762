//! Configuration for the tier store.
//!
//! # Example
//!
//! ```
//! use tier_store::StoreConfig;
//!
//! // Minimal config (uses defaults)
//! let config = StoreConfig::default();
//! assert_eq!(config.quiet_period_ms, 5_000);
//!
//! // Full config
//! let config = StoreConfig {
//!     local_db_url: Some("sqlite:tier_store.db".into()),
//!     remote_url: Some("https://kv.example.com/api/store".into()),
//!     quiet_period_ms: 1_000,
//!     max_wait_ms: 4_000,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the tier store.
///
/// All fields have sensible defaults. Without `local_db_url` the store runs
/// remote-only; without `remote_url` it runs device-local only.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite connection string for the per-device store
    /// (e.g., "sqlite:tier_store.db")
    #[serde(default)]
    pub local_db_url: Option<String>,

    /// Endpoint of the shared remote store
    /// (e.g., "https://kv.example.com/api/store")
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Opaque access token forwarded verbatim to the remote store
    #[serde(default)]
    pub remote_token: Option<String>,

    /// Quiet period: a flush fires this long after the most recent write
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Maximum wait: a flush fires no later than this long after the first
    /// unflushed write, regardless of continued write activity
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Delay before the background remote refresh that follows a local hit
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Per-request timeout for remote store calls
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Granularity of the maintenance loop that evaluates flush deadlines
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_quiet_period_ms() -> u64 { 5_000 }
fn default_max_wait_ms() -> u64 { 20_000 }
fn default_refresh_delay_ms() -> u64 { 1_000 }
fn default_remote_timeout_ms() -> u64 { 10_000 }
fn default_tick_interval_ms() -> u64 { 100 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            local_db_url: None,
            remote_url: None,
            remote_token: None,
            quiet_period_ms: default_quiet_period_ms(),
            max_wait_ms: default_max_wait_ms(),
            refresh_delay_ms: default_refresh_delay_ms(),
            remote_timeout_ms: default_remote_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(config.local_db_url.is_none());
        assert!(config.remote_url.is_none());
        assert_eq!(config.quiet_period_ms, 5_000);
        assert_eq!(config.max_wait_ms, 20_000);
        assert_eq!(config.refresh_delay_ms, 1_000);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"remote_url": "https://kv.example.com", "quiet_period_ms": 250}"#,
        )
        .unwrap();

        assert_eq!(config.remote_url.as_deref(), Some("https://kv.example.com"));
        assert_eq!(config.quiet_period_ms, 250);
        // Unspecified fields fall back to defaults
        assert_eq!(config.max_wait_ms, 20_000);
    }
}
