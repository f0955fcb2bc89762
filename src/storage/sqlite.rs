// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQLite storage backend for the per-device tier.
//!
//! Values are stored as JSON text in a single table:
//! ```sql
//! CREATE TABLE kv_entries (
//!   key   TEXT PRIMARY KEY,
//!   value TEXT NOT NULL  -- JSON as text
//! )
//! ```
//!
//! The store is scoped to one device; nothing here is shared across devices.
//! A row that fails to parse as JSON is reported as unavailability rather
//! than silently treated as absent, so a corrupted file does not masquerade
//! as an empty store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::traits::{LocalStore, StoreError};
use crate::retry::{retry, RetryConfig};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database behind a connection string
    /// like `sqlite:tier_store.db`, with startup-mode retry so transient
    /// filesystem hiccups are absorbed but bad paths fail fast.
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|e| StoreError::LocalUnavailable(e.to_string()))?
            .create_if_missing(true);

        let pool = retry("sqlite_connect", &RetryConfig::startup(), || {
            let options = options.clone();
            async move {
                SqlitePoolOptions::new()
                    .max_connections(4)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect_with(options)
                    .await
                    .map_err(|e| StoreError::LocalUnavailable(e.to_string()))
            }
        })
        .await?;

        let store = Self { pool };
        store.enable_wal_mode().await?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Enable WAL journal mode: readers don't block the coordinator's
    /// fire-and-forget writes, and writes need a single fsync.
    async fn enable_wal_mode(&self) -> Result<(), StoreError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::LocalUnavailable(format!("Failed to enable WAL mode: {}", e)))?;

        // WAL mode is safe with NORMAL and avoids a second fsync per commit
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::LocalUnavailable(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let pool = &self.pool;
        retry("sqlite_init_schema", &RetryConfig::startup(), || async move {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS kv_entries (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )
                "#,
            )
            .execute(pool)
            .await
            .map_err(|e| StoreError::LocalUnavailable(e.to_string()))
        })
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = value.to_string();

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::LocalUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::LocalUnavailable(e.to_string()))?;

        match row {
            Some(row) => {
                let text: String = row
                    .try_get("value")
                    .map_err(|e| StoreError::LocalUnavailable(e.to_string()))?;
                let value = serde_json::from_str(&text).map_err(|e| {
                    StoreError::LocalUnavailable(format!("corrupt entry for '{}': {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::LocalUnavailable(e.to_string()))?;

        Ok(())
    }
}
