//! JSON-RPC over HTTP provider

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::listeners::ListenerSet;
use super::types::{codes, Listener, ListenerId, ProviderEvent, ProviderEventKind, RpcError};
use super::{Eip1193Provider, ProviderDetail, ProviderInfo};

/// Provider that forwards requests to a JSON-RPC endpoint, such as a
/// development node with unlocked accounts or a signing proxy.
///
/// HTTP has no push channel, so notifications are only delivered when the
/// host forwards them with [`HttpProvider::emit`].
#[derive(Debug)]
pub struct HttpProvider {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    listeners: ListenerSet,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            listeners: ListenerSet::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a notification to registered listeners
    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.listeners.emit(event)
    }

    /// Wrap the provider in an announceable detail with a fresh identifier
    pub fn into_detail(self: Arc<Self>, name: impl Into<String>) -> ProviderDetail {
        let info = ProviderInfo {
            uuid: Uuid::new_v4().to_string(),
            name: name.into(),
            icon: String::new(),
            rdns: None,
        };
        ProviderDetail::new(info, self)
    }
}

#[async_trait]
impl Eip1193Provider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = match params {
            Value::Null => json!([]),
            other => other,
        };
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(url = %self.url, method, id, "json-rpc request");
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::new(codes::DISCONNECTED, format!("Request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, format!("Invalid response body: {}", e)))?;

        if let Some(error) = body.get("error") {
            return Err(serde_json::from_value(error.clone()).unwrap_or_else(|_| {
                RpcError::new(codes::INTERNAL_ERROR, error.to_string())
            }));
        }
        if !status.is_success() {
            return Err(RpcError::new(
                codes::INTERNAL_ERROR,
                format!("HTTP status {}", status),
            ));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| RpcError::new(codes::INTERNAL_ERROR, "Response is missing a result"))
    }

    fn on(&self, kind: ProviderEventKind, listener: Listener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}
