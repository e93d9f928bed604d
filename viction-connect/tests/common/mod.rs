//! Shared fixtures for connector tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, U256};

use viction_connect::client::{ChainReader, ReaderFactory};
use viction_connect::provider::InMemoryProvider;
use viction_connect::{
    ChainDescriptor, Error, Network, ProviderDetail, Result, WalletConnector, WalletEvents,
};

pub fn account() -> Address {
    Address::repeat_byte(0x42)
}

/// Read client that reports the same balance for every account
pub struct FixedBalanceReader(pub U256);

#[async_trait]
impl ChainReader for FixedBalanceReader {
    async fn get_balance(&self, _account: Address) -> Result<U256> {
        Ok(self.0)
    }
}

pub fn fixed_reader(balance: U256) -> ReaderFactory {
    Arc::new(move |_: &ChainDescriptor| -> Result<Arc<dyn ChainReader>> {
        Ok(Arc::new(FixedBalanceReader(balance)))
    })
}

pub fn connector(network: Network) -> WalletConnector {
    WalletConnector::with_reader_factory(network, Duration::from_millis(200), fixed_reader(U256::exp10(18)))
}

pub fn wallet(chain_id: u64) -> Arc<InMemoryProvider> {
    Arc::new(InMemoryProvider::new(chain_id, vec![account()]))
}

pub fn detail(provider: &Arc<InMemoryProvider>, uuid: &str) -> ProviderDetail {
    provider.clone().into_detail(uuid, "Test Wallet", Some("io.example.wallet"))
}

/// Host callback invocation, as recorded by [`RecordingEvents`]
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Connect(String),
    Disconnect,
    AccountChanged(Address),
    ChainChanged(u64),
    Error(Error),
}

/// Host callbacks that record every invocation
#[derive(Default)]
pub struct RecordingEvents {
    calls: Mutex<Vec<Callback>>,
}

impl RecordingEvents {
    pub fn calls(&self) -> Vec<Callback> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Callback) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    fn push(&self, callback: Callback) {
        self.calls.lock().unwrap().push(callback);
    }
}

impl WalletEvents for RecordingEvents {
    fn on_connect(&self, provider: &ProviderDetail) {
        self.push(Callback::Connect(provider.id().to_string()));
    }

    fn on_disconnect(&self) {
        self.push(Callback::Disconnect);
    }

    fn on_account_changed(&self, account: Address) {
        self.push(Callback::AccountChanged(account));
    }

    fn on_chain_changed(&self, chain: &ChainDescriptor) {
        self.push(Callback::ChainChanged(chain.id));
    }

    fn on_error(&self, error: &Error) {
        self.push(Callback::Error(error.clone()));
    }
}
