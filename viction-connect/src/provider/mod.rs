//! EIP-1193 wallet providers
//!
//! A provider is the request/subscribe handle a wallet exposes. This module
//! defines the trait the connector drives, the descriptor a wallet announces
//! during discovery, and two implementations: a JSON-RPC HTTP provider and a
//! deterministic in-memory provider.

mod types;
mod listeners;
mod http;
mod memory;

pub use types::*;
pub use listeners::*;
pub use http::*;
pub use memory::*;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Request/subscribe interface of an injected wallet
#[async_trait]
pub trait Eip1193Provider: Send + Sync + fmt::Debug {
    /// Issue a JSON-RPC style request
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError>;

    /// Register a listener for one notification kind
    fn on(&self, kind: ProviderEventKind, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns false if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// The only chain this wallet can operate on, if it is restricted to one
    fn supported_chain(&self) -> Option<u64> {
        None
    }
}

/// Wallet metadata announced during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Unique identifier of this provider instance
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Icon, usually a data URI
    pub icon: String,
    /// Reverse-DNS registration domain
    pub rdns: Option<String>,
}

/// An announced wallet: its metadata plus its RPC handle
#[derive(Clone)]
pub struct ProviderDetail {
    pub info: ProviderInfo,
    pub provider: Option<Arc<dyn Eip1193Provider>>,
    pub accounts: Vec<ethers::types::Address>,
}

impl ProviderDetail {
    pub fn new(info: ProviderInfo, provider: Arc<dyn Eip1193Provider>) -> Self {
        Self {
            info,
            provider: Some(provider),
            accounts: Vec::new(),
        }
    }

    /// Identifier used for deduplication
    pub fn id(&self) -> &str {
        &self.info.uuid
    }
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail")
            .field("info", &self.info)
            .field("has_provider", &self.provider.is_some())
            .field("accounts", &self.accounts)
            .finish()
    }
}

/// Issue a request bounded by `timeout`
pub async fn request_with_timeout(
    provider: &dyn Eip1193Provider,
    method: &str,
    params: Value,
    timeout: Duration,
) -> Result<Value> {
    debug!(method, "wallet request");
    match tokio::time::timeout(timeout, provider.request(method, params)).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Timeout {
            method: method.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}
