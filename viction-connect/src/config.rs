//! Connector configuration

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chains::Network;
use crate::error::{Error, Result};

/// Registration domain that marks a provider as a sponsor wallet
pub const DEFAULT_SPONSOR_RDNS: &str = "world.abstraction.wallet";

/// Default timeout applied to every wallet RPC call
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;

/// Default capacity of the discovery broadcast channel
pub const DEFAULT_DISCOVERY_CAPACITY: usize = 64;

/// What the event bridge does when a wallet reports a chain other than the
/// configured network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainMismatchPolicy {
    /// Report the mismatch through the error callback only
    Report,
    /// Report the mismatch, then disconnect
    Disconnect,
}

impl FromStr for ChainMismatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(ChainMismatchPolicy::Report),
            "disconnect" => Ok(ChainMismatchPolicy::Disconnect),
            other => Err(Error::InvalidInput(format!("Unknown chain mismatch policy: {}", other))),
        }
    }
}

/// Configuration passed once to [`crate::WalletKit::init`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Network the connector is bound to
    pub network: Network,
    /// Timeout for a single wallet RPC call, in milliseconds
    pub rpc_timeout_ms: u64,
    /// Registration domain identifying sponsor wallets
    pub sponsor_rdns: String,
    /// Reaction to a chain-changed notification for a foreign chain
    pub chain_mismatch: ChainMismatchPolicy,
    /// Capacity of the discovery channel
    pub discovery_capacity: usize,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            sponsor_rdns: DEFAULT_SPONSOR_RDNS.to_string(),
            chain_mismatch: ChainMismatchPolicy::Disconnect,
            discovery_capacity: DEFAULT_DISCOVERY_CAPACITY,
        }
    }
}

impl ConnectConfig {
    /// Build a configuration from `VICTION_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(network) = std::env::var("VICTION_NETWORK") {
            config.network = network.parse()?;
        }
        if let Ok(timeout) = std::env::var("VICTION_RPC_TIMEOUT_MS") {
            config.rpc_timeout_ms = timeout
                .parse()
                .map_err(|e| Error::InvalidInput(format!("Invalid VICTION_RPC_TIMEOUT_MS: {}", e)))?;
        }
        if let Ok(rdns) = std::env::var("VICTION_SPONSOR_RDNS") {
            config.sponsor_rdns = rdns;
        }
        if let Ok(policy) = std::env::var("VICTION_CHAIN_MISMATCH") {
            config.chain_mismatch = policy.parse()?;
        }

        Ok(config)
    }

    /// RPC timeout as a [`Duration`]
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectConfig::default();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(30));
        assert_eq!(config.sponsor_rdns, "world.abstraction.wallet");
        assert_eq!(config.chain_mismatch, ChainMismatchPolicy::Disconnect);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ConnectConfig = serde_json::from_str(
            r#"{ "network": "testnet", "chain_mismatch": "report" }"#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.chain_mismatch, ChainMismatchPolicy::Report);
        assert_eq!(config.rpc_timeout_ms, DEFAULT_RPC_TIMEOUT_MS);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Report".parse::<ChainMismatchPolicy>().unwrap(), ChainMismatchPolicy::Report);
        assert!("sometimes".parse::<ChainMismatchPolicy>().is_err());
    }
}
