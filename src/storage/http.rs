//! HTTP storage backend for the shared durable tier.
//!
//! The remote service exposes a single POST endpoint with an
//! action-discriminated JSON envelope:
//!
//! ```json
//! {"action": "get", "key": "user.alice", "token": "..."}
//! {"action": "set", "key": "user.alice", "document": "{\"role\":\"admin\"}"}
//! {"action": "bulk_upsert", "documents": [{"key": "...", "document": "..."}]}
//! ```
//!
//! Values travel as JSON text in the `document` field; the server stores the
//! text opaquely and upserts by key. A `get` response carries `document` when
//! the key exists and omits it (or sends null) when it does not, which keeps
//! absence distinguishable from any stored value.
//!
//! The token, when configured, is forwarded verbatim in every request body;
//! what it means is the server's business.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::traits::{RemoteStore, StoreError};

pub struct HttpStore {
    client: Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<Vec<WireEntry>>,
}

#[derive(Serialize)]
struct WireEntry {
    key: String,
    document: String,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    upserted: Option<u64>,
}

impl HttpStore {
    /// Build a store for the given endpoint. `timeout` bounds every request
    /// so a dead remote degrades instead of hanging the read path.
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::RemoteUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            token,
        })
    }

    fn request<'a>(&'a self, action: &'a str) -> WireRequest<'a> {
        WireRequest {
            action,
            token: self.token.as_deref(),
            key: None,
            document: None,
            documents: None,
        }
    }

    /// POST the envelope, insisting on a 2xx status and a parseable body.
    async fn send(&self, body: &WireRequest<'_>) -> Result<WireResponse, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::RemoteUnavailable(format!(
                "{} returned status {}",
                body.action, status
            )));
        }

        response
            .json::<WireResponse>()
            .await
            .map_err(|e| StoreError::RemoteUnavailable(format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut body = self.request("set");
        body.key = Some(key);
        body.document = Some(value.to_string());

        self.send(&body).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut body = self.request("get");
        body.key = Some(key);

        let response = self.send(&body).await?;

        match response.document {
            Some(text) => {
                let value = serde_json::from_str(&text).map_err(|e| {
                    StoreError::RemoteUnavailable(format!("malformed document for '{}': {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn bulk_upsert(&self, entries: &HashMap<String, Value>) -> Result<usize, StoreError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut body = self.request("bulk_upsert");
        body.documents = Some(
            entries
                .iter()
                .map(|(key, value)| WireEntry {
                    key: key.clone(),
                    document: value.to_string(),
                })
                .collect(),
        );

        let response = self.send(&body).await?;
        Ok(response.upserted.map_or(entries.len(), |n| n as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let store = HttpStore::new(
            "https://kv.example.com/api/store",
            Some("secret".into()),
            Duration::from_secs(10),
        )
        .unwrap();

        let mut body = store.request("get");
        body.key = Some("user.alice");

        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(
            encoded,
            json!({"action": "get", "token": "secret", "key": "user.alice"})
        );
    }

    #[test]
    fn test_set_envelope_carries_document_text() {
        let store =
            HttpStore::new("https://kv.example.com", None, Duration::from_secs(10)).unwrap();

        let mut body = store.request("set");
        body.key = Some("k");
        body.document = Some(json!({"a": 1}).to_string());

        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(
            encoded,
            json!({"action": "set", "key": "k", "document": "{\"a\":1}"})
        );
    }

    #[test]
    fn test_response_without_document_is_absence() {
        let response: WireResponse = serde_json::from_str("{}").unwrap();
        assert!(response.document.is_none());

        let response: WireResponse = serde_json::from_str(r#"{"document": null}"#).unwrap();
        assert!(response.document.is_none());

        let response: WireResponse =
            serde_json::from_str(r#"{"document": "\"stored\""}"#).unwrap();
        assert_eq!(response.document.as_deref(), Some("\"stored\""));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_remote_unavailable() {
        // Reserved TEST-NET address, nothing listens there
        let store = HttpStore::new(
            "http://192.0.2.1:9/store",
            None,
            Duration::from_millis(100),
        )
        .unwrap();

        let result = store.get("k").await;
        assert!(matches!(result, Err(StoreError::RemoteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_bulk_upsert_skips_network() {
        let store = HttpStore::new(
            "http://192.0.2.1:9/store",
            None,
            Duration::from_millis(100),
        )
        .unwrap();

        // No entries, no request: succeeds even though the endpoint is dead
        let written = store.bulk_upsert(&HashMap::new()).await.unwrap();
        assert_eq!(written, 0);
    }
}
