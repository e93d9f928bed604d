//! Error types for the connector library

use thiserror::Error;

use crate::provider::RpcError;

/// Custom error type for connector operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Provider not found")]
    ProviderMissing,

    #[error("Wallet not connected")]
    NotConnected,

    #[error("User rejected the request: {0}")]
    UserRejected(String),

    #[error("Provider only supports chain {provider_chain}, selected network is {selected_chain}")]
    UnsupportedNetwork {
        provider_chain: u64,
        selected_chain: u64,
    },

    #[error("Cannot switch to chain {chain_id}: {reason}")]
    ChainSwitchFailed { chain_id: u64, reason: String },

    #[error("Unknown chain ID {reported}, expected {expected}")]
    UnknownChain { reported: u64, expected: u64 },

    #[error("Wallet call {method} timed out after {after_ms}ms")]
    Timeout { method: String, after_ms: u64 },

    #[error("Wallet RPC error: {0}")]
    Rpc(RpcError),

    /// Disconnect notification pushed by the wallet itself
    #[error("Wallet disconnected: {0}")]
    ProviderDisconnected(RpcError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        Error::Rpc(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, Error>;
