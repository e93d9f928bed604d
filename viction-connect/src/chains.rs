//! Supported Viction networks

use std::fmt;
use std::str::FromStr;

use ethers::types::U256;
use ethers::utils::format_units;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Viction mainnet chain ID
pub const MAINNET_CHAIN_ID: u64 = 88;

/// Viction testnet chain ID
pub const TESTNET_CHAIN_ID: u64 = 89;

/// Networks the connector can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// All supported networks
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    /// Numeric chain ID of the network
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Mainnet => MAINNET_CHAIN_ID,
            Network::Testnet => TESTNET_CHAIN_ID,
        }
    }

    /// Look a network up by chain ID
    pub fn from_chain_id(chain_id: u64) -> Option<Network> {
        Network::ALL.into_iter().find(|n| n.chain_id() == chain_id)
    }

    /// Full descriptor of the network
    pub fn descriptor(self) -> ChainDescriptor {
        match self {
            Network::Mainnet => ChainDescriptor {
                id: MAINNET_CHAIN_ID,
                name: "Viction Mainnet".to_string(),
                native_currency: NativeCurrency::viction(),
                rpc_urls: RpcUrls {
                    http: vec!["https://rpc.viction.xyz".to_string()],
                    web_socket: vec!["wss://ws.viction.xyz".to_string()],
                },
                block_explorer: BlockExplorer {
                    name: "Explorer".to_string(),
                    url: "https://vicscan.xyz".to_string(),
                },
                testnet: false,
            },
            Network::Testnet => ChainDescriptor {
                id: TESTNET_CHAIN_ID,
                name: "Viction Testnet".to_string(),
                native_currency: NativeCurrency::viction(),
                rpc_urls: RpcUrls {
                    http: vec!["https://rpc-testnet.viction.xyz".to_string()],
                    web_socket: vec!["wss://ws-testnet.viction.xyz".to_string()],
                },
                block_explorer: BlockExplorer {
                    name: "Explorer".to_string(),
                    url: "https://testnet.vicscan.xyz".to_string(),
                },
                testnet: true,
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(Error::InvalidInput(format!("Unsupported network: {}", other))),
        }
    }
}

/// Native currency metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl NativeCurrency {
    fn viction() -> Self {
        Self {
            name: "Viction".to_string(),
            symbol: "VIC".to_string(),
            decimals: 18,
        }
    }
}

/// RPC endpoints of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcUrls {
    pub http: Vec<String>,
    pub web_socket: Vec<String>,
}

/// Block explorer of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockExplorer {
    pub name: String,
    pub url: String,
}

/// Network descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Chain ID
    pub id: u64,
    /// Display name
    pub name: String,
    /// Native currency
    pub native_currency: NativeCurrency,
    /// RPC endpoints
    pub rpc_urls: RpcUrls,
    /// Block explorer
    pub block_explorer: BlockExplorer,
    /// Whether this is a test network
    pub testnet: bool,
}

impl ChainDescriptor {
    /// Chain ID as the `0x`-prefixed hex quantity wallets expect
    pub fn hex_id(&self) -> String {
        format!("{:#x}", self.id)
    }

    /// Parameters for `wallet_addEthereumChain`
    pub fn add_chain_params(&self) -> serde_json::Value {
        serde_json::json!({
            "chainId": self.hex_id(),
            "chainName": self.name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls.http,
            "blockExplorerUrls": [self.block_explorer.url],
        })
    }

    /// Format a raw balance in the network's display unit
    pub fn format_balance(&self, balance: U256) -> Result<String> {
        format_native(balance, self.native_currency.decimals)
    }
}

/// All supported network descriptors
pub fn supported_networks() -> Vec<ChainDescriptor> {
    Network::ALL.into_iter().map(Network::descriptor).collect()
}

/// Parse a chain ID as reported by a wallet: a `0x` hex quantity or a decimal string
pub fn parse_chain_id(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };

    parsed.map_err(|e| Error::InvalidInput(format!("Invalid chain ID {:?}: {}", raw, e)))
}

/// Convert a fixed-point amount to a decimal string without trailing zeros
pub fn format_native(amount: U256, decimals: u32) -> Result<String> {
    let formatted = format_units(amount, decimals)
        .map_err(|e| Error::InvalidInput(format!("Cannot format amount: {}", e)))?;

    if !formatted.contains('.') {
        return Ok(formatted);
    }

    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_chain_id() {
        assert_eq!(Network::from_chain_id(88), Some(Network::Mainnet));
        assert_eq!(Network::from_chain_id(89), Some(Network::Testnet));
        assert_eq!(Network::from_chain_id(1), None);
    }

    #[test]
    fn test_descriptors() {
        let networks = supported_networks();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].name, "Viction Mainnet");
        assert_eq!(networks[0].native_currency.symbol, "VIC");
        assert!(networks[1].testnet);
        assert_eq!(networks[1].rpc_urls.http[0], "https://rpc-testnet.viction.xyz");
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("goerli".parse::<Network>().is_err());
    }

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id("0x58").unwrap(), 88);
        assert_eq!(parse_chain_id("0x59").unwrap(), 89);
        assert_eq!(parse_chain_id("89").unwrap(), 89);
        assert!(parse_chain_id("0xzz").is_err());
    }

    #[test]
    fn test_hex_id() {
        assert_eq!(Network::Mainnet.descriptor().hex_id(), "0x58");
    }

    #[test]
    fn test_format_native() {
        let one = U256::exp10(18);
        assert_eq!(format_native(one, 18).unwrap(), "1");
        assert_eq!(format_native(U256::from(1_500_000_000_000_000_000u64), 18).unwrap(), "1.5");
        assert_eq!(format_native(U256::zero(), 18).unwrap(), "0");
        assert_eq!(format_native(U256::from(1u64), 18).unwrap(), "0.000000000000000001");
    }
}
