//! Clients derived from a bound provider
//!
//! The write client talks to the wallet; the read client talks to the network
//! directly and never touches the wallet.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, TransactionRequest, H256, U256};
use serde_json::{json, Value};

use crate::chains::{parse_chain_id, ChainDescriptor};
use crate::error::{Error, Result};
use crate::provider::{methods, request_with_timeout, Eip1193Provider};

/// Wallet-backed client used for authorization, chain management and
/// transaction submission
#[derive(Debug, Clone)]
pub struct WalletClient {
    provider: Arc<dyn Eip1193Provider>,
    chain: ChainDescriptor,
    timeout: Duration,
}

impl WalletClient {
    pub fn new(provider: Arc<dyn Eip1193Provider>, chain: ChainDescriptor, timeout: Duration) -> Self {
        Self {
            provider,
            chain,
            timeout,
        }
    }

    pub fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        request_with_timeout(self.provider.as_ref(), method, params, self.timeout).await
    }

    /// Chain the wallet is currently on
    pub async fn chain_id(&self) -> Result<u64> {
        let raw = self.request(methods::CHAIN_ID, json!([])).await?;
        chain_id_from_value(&raw)
    }

    /// Ask the wallet to authorize its addresses
    pub async fn request_addresses(&self) -> Result<Vec<Address>> {
        let raw = self.request(methods::REQUEST_ACCOUNTS, json!([])).await?;
        parse_addresses(raw)
    }

    /// Addresses already authorized, without prompting
    pub async fn addresses(&self) -> Result<Vec<Address>> {
        let raw = self.request(methods::ACCOUNTS, json!([])).await?;
        parse_addresses(raw)
    }

    /// Register the client's chain with the wallet
    pub async fn add_chain(&self) -> Result<()> {
        self.request(methods::ADD_CHAIN, json!([self.chain.add_chain_params()]))
            .await
            .map(|_| ())
    }

    /// Ask the wallet to switch to `chain_id`
    pub async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.request(methods::SWITCH_CHAIN, json!([{ "chainId": format!("{:#x}", chain_id) }]))
            .await
            .map(|_| ())
    }

    /// Submit a transaction for the wallet to sign and broadcast
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        let params = json!([serde_json::to_value(tx)?]);
        let raw = self.request(methods::SEND_TRANSACTION, params).await?;
        let hash = raw
            .as_str()
            .ok_or_else(|| Error::Serialization("Transaction hash must be a string".to_string()))?;
        H256::from_str(hash).map_err(|e| Error::Serialization(format!("Invalid transaction hash: {}", e)))
    }
}

/// Read-only network access
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Native-currency balance in base units
    async fn get_balance(&self, account: Address) -> Result<U256>;
}

#[async_trait]
impl ChainReader for Provider<Http> {
    async fn get_balance(&self, account: Address) -> Result<U256> {
        Middleware::get_balance(self, account, None)
            .await
            .map_err(|e| Error::Network(format!("Failed to get balance: {}", e)))
    }
}

/// Builds the read client for a network
pub type ReaderFactory = Arc<dyn Fn(&ChainDescriptor) -> Result<Arc<dyn ChainReader>> + Send + Sync>;

/// Read client over the network's first HTTP endpoint
pub fn http_reader(chain: &ChainDescriptor) -> Result<Arc<dyn ChainReader>> {
    let url = chain
        .rpc_urls
        .http
        .first()
        .ok_or_else(|| Error::Network(format!("No HTTP endpoint for {}", chain.name)))?;
    let provider = Provider::<Http>::try_from(url.as_str())
        .map_err(|e| Error::Network(format!("Failed to create provider: {}", e)))?;
    Ok(Arc::new(provider))
}

/// Default factory, backed by [`http_reader`]
pub fn default_reader_factory() -> ReaderFactory {
    Arc::new(http_reader)
}

fn chain_id_from_value(raw: &Value) -> Result<u64> {
    match raw {
        Value::String(s) => parse_chain_id(s),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::InvalidInput(format!("Invalid chain ID {}", n))),
        other => Err(Error::InvalidInput(format!("Invalid chain ID {}", other))),
    }
}

fn parse_addresses(raw: Value) -> Result<Vec<Address>> {
    let list: Vec<String> = serde_json::from_value(raw)?;
    list.iter()
        .map(|a| Address::from_str(a).map_err(|e| Error::InvalidInput(format!("Invalid address {}: {}", a, e))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::Network;
    use crate::provider::InMemoryProvider;

    fn client(provider: Arc<InMemoryProvider>) -> WalletClient {
        WalletClient::new(provider, Network::Mainnet.descriptor(), Duration::from_secs(1))
    }

    #[test]
    fn test_chain_id_from_value() {
        assert_eq!(chain_id_from_value(&json!("0x59")).unwrap(), 89);
        assert_eq!(chain_id_from_value(&json!(88)).unwrap(), 88);
        assert!(chain_id_from_value(&json!(null)).is_err());
    }

    #[tokio::test]
    async fn test_add_then_switch() {
        let provider = Arc::new(InMemoryProvider::new(1, vec![]));
        let wallet = client(provider.clone());

        wallet.add_chain().await.unwrap();
        wallet.switch_chain(88).await.unwrap();

        assert_eq!(wallet.chain_id().await.unwrap(), 88);
        assert_eq!(
            provider.calls(),
            vec![methods::ADD_CHAIN, methods::SWITCH_CHAIN, methods::CHAIN_ID]
        );
    }

    #[tokio::test]
    async fn test_request_addresses() {
        let account = Address::repeat_byte(0xab);
        let wallet = client(Arc::new(InMemoryProvider::new(88, vec![account])));
        assert_eq!(wallet.request_addresses().await.unwrap(), vec![account]);
        assert_eq!(wallet.addresses().await.unwrap(), vec![account]);
    }

    #[tokio::test]
    async fn test_send_transaction_returns_hash() {
        let account = Address::repeat_byte(0x01);
        let wallet = client(Arc::new(InMemoryProvider::new(88, vec![account])));
        let tx = TransactionRequest::new().from(account).to(account).value(1u64);

        let hash = wallet.send_transaction(&tx).await.unwrap();
        assert_ne!(hash, H256::zero());
    }
}
