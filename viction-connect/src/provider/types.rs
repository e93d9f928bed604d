//! Provider wire types

use std::fmt;
use std::sync::Arc;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// EIP-1193 and JSON-RPC error codes
pub mod codes {
    pub const USER_REJECTED_REQUEST: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Wallet RPC method names
pub mod methods {
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
}

/// Error returned by a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(codes::USER_REJECTED_REQUEST, "User rejected the request.")
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == codes::USER_REJECTED_REQUEST || self.code == codes::UNAUTHORIZED
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

/// Notification channels a provider exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
    Disconnect,
}

/// A notification emitted by a provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// New list of authorized accounts
    AccountsChanged(Vec<Address>),
    /// New chain ID, as reported by the wallet (hex quantity)
    ChainChanged(String),
    /// The provider lost its connection
    Disconnect(RpcError),
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            ProviderEvent::ChainChanged(_) => ProviderEventKind::ChainChanged,
            ProviderEvent::Disconnect(_) => ProviderEventKind::Disconnect,
        }
    }
}

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Notification callback
pub type Listener = Arc<dyn Fn(ProviderEvent) + Send + Sync>;
