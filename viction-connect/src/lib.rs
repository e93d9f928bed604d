//! Viction Connect - wallet connector core
//!
//! This library lets a host application discover injected wallets through the
//! EIP-6963 announce/request handshake, connect to one of them over EIP-1193,
//! verify and switch the active network, and follow account and chain changes
//! reported by the wallet.

pub mod error;
pub mod config;
pub mod chains;
pub mod provider;
pub mod discovery;
pub mod registry;
pub mod client;
pub mod connector;
pub mod bridge;
pub mod kit;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use config::{ChainMismatchPolicy, ConnectConfig};
pub use chains::{ChainDescriptor, Network};
pub use provider::{Eip1193Provider, ProviderDetail, ProviderEvent, ProviderInfo, RpcError};
pub use discovery::{DiscoveryBus, DiscoveryMessage};
pub use registry::{ProviderKind, ProviderRegistry};
pub use connector::{AccountSnapshot, ChainMatch, ConnectionState, WalletConnector};
pub use bridge::{EventBridge, NoopEvents, WalletEvents};
pub use kit::WalletKit;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
