//! Wallet connector
//!
//! Holds the selected network and the provider currently bound to it, and
//! drives the connect / switch-chain / query sequence against that provider.
//! Operations on one connector are serialized: a second `connect` waits for
//! the first to finish instead of racing it.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::{Address, TransactionRequest, H256};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{info, instrument, warn};

use crate::bridge::WalletEvents;
use crate::chains::{ChainDescriptor, Network};
use crate::client::{default_reader_factory, ChainReader, ReaderFactory, WalletClient};
use crate::error::{Error, Result};
use crate::provider::{Eip1193Provider, ProviderDetail};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    SwitchingChain,
}

/// How the chain-match protocol reached the target network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMatch {
    /// The wallet already reported the target chain
    AlreadyOnChain,
    /// The wallet was connected and switched to the target chain
    Switched,
}

/// Account and formatted balance of the connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub account: Address,
    pub balance: String,
}

#[derive(Default)]
struct Binding {
    detail: Option<ProviderDetail>,
    wallet: Option<WalletClient>,
    reader: Option<Arc<dyn ChainReader>>,
}

/// Connector bound to one network
pub struct WalletConnector {
    network: ChainDescriptor,
    rpc_timeout: Duration,
    reader_factory: ReaderFactory,
    binding: Mutex<Binding>,
    state: watch::Sender<ConnectionState>,
}

impl WalletConnector {
    pub fn new(network: Network, rpc_timeout: Duration) -> Self {
        Self::with_reader_factory(network, rpc_timeout, default_reader_factory())
    }

    /// Create a connector with a custom read-client factory
    pub fn with_reader_factory(network: Network, rpc_timeout: Duration, reader_factory: ReaderFactory) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            network: network.descriptor(),
            rpc_timeout,
            reader_factory,
            binding: Mutex::new(Binding::default()),
            state,
        }
    }

    /// Descriptor of the configured network
    pub fn network(&self) -> &ChainDescriptor {
        &self.network
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// True when both a provider and a write client are bound
    pub async fn is_connected(&self) -> bool {
        let binding = self.binding.lock().await;
        binding.detail.is_some() && binding.wallet.is_some()
    }

    /// Currently bound provider
    pub async fn provider(&self) -> Option<ProviderDetail> {
        self.binding.lock().await.detail.clone()
    }

    /// Identifier of the currently bound provider
    pub async fn bound_id(&self) -> Option<String> {
        let binding = self.binding.lock().await;
        binding.detail.as_ref().map(|d| d.id().to_string())
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn bind(&self, binding: &mut Binding, detail: &ProviderDetail) -> Result<WalletClient> {
        let provider: Arc<dyn Eip1193Provider> = detail.provider.clone().ok_or(Error::ProviderMissing)?;

        if let Some(only) = provider.supported_chain() {
            if only != self.network.id {
                return Err(Error::UnsupportedNetwork {
                    provider_chain: only,
                    selected_chain: self.network.id,
                });
            }
        }

        let wallet = WalletClient::new(provider, self.network.clone(), self.rpc_timeout);
        let reader = (self.reader_factory)(&self.network)?;

        binding.detail = Some(detail.clone());
        binding.wallet = Some(wallet.clone());
        binding.reader = Some(reader);
        Ok(wallet)
    }

    /// Bind `detail`, derive both clients and request address authorization.
    /// Returns the authorized addresses.
    #[instrument(skip(self, detail), fields(provider = %detail.info.name))]
    pub async fn connect(&self, detail: &ProviderDetail) -> Result<Vec<Address>> {
        let mut binding = self.binding.lock().await;
        self.set_state(ConnectionState::Connecting);

        let result = match self.bind(&mut binding, detail) {
            Ok(wallet) => wallet.request_addresses().await.map_err(|e| match e {
                Error::Rpc(rpc) if rpc.is_user_rejection() => Error::UserRejected(rpc.message),
                other => other,
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(accounts) => {
                info!(accounts = accounts.len(), "wallet connected");
                self.set_state(ConnectionState::Connected);
                Ok(accounts)
            }
            Err(e) => {
                warn!(error = %e, "wallet connection failed");
                *binding = Binding::default();
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Add the configured network to the wallet, then switch it to `chain_id`.
    /// A failed switch releases the binding.
    #[instrument(skip(self))]
    pub async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let mut binding = self.binding.lock().await;
        let wallet = binding.wallet.clone().ok_or(Error::NotConnected)?;

        self.set_state(ConnectionState::SwitchingChain);
        let result = match wallet.add_chain().await {
            Ok(()) => wallet.switch_chain(chain_id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "chain switch failed");
                *binding = Binding::default();
                self.set_state(ConnectionState::Disconnected);
                Err(Error::ChainSwitchFailed {
                    chain_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// First authorized address, or `None` when the wallet authorizes none
    #[instrument(skip(self))]
    pub async fn get_account(&self) -> Result<Option<Address>> {
        let binding = self.binding.lock().await;
        let wallet = binding.wallet.as_ref().ok_or(Error::NotConnected)?;
        let accounts = wallet.request_addresses().await?;
        Ok(accounts.into_iter().next())
    }

    /// Native balance of `account`, formatted in the network's display unit
    #[instrument(skip(self))]
    pub async fn get_balance(&self, account: Address) -> Result<String> {
        let reader = {
            let binding = self.binding.lock().await;
            binding.reader.clone().ok_or(Error::NotConnected)?
        };
        let balance = reader.get_balance(account).await?;
        self.network.format_balance(balance)
    }

    /// Submit a transaction through the wallet
    #[instrument(skip(self, tx))]
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        let binding = self.binding.lock().await;
        let wallet = binding.wallet.as_ref().ok_or(Error::NotConnected)?;
        wallet.send_transaction(tx).await
    }

    /// Verify the bound wallet is on the configured network
    #[instrument(skip(self))]
    pub async fn detect_chain(&self) -> Result<ChainDescriptor> {
        let binding = self.binding.lock().await;
        let wallet = binding.wallet.as_ref().ok_or(Error::NotConnected)?;
        let chain_id = wallet.chain_id().await?;

        if chain_id == self.network.id {
            Ok(self.network.clone())
        } else {
            warn!(reported = chain_id, expected = self.network.id, "unknown chain ID");
            Err(Error::UnknownChain {
                reported: chain_id,
                expected: self.network.id,
            })
        }
    }

    /// Release the bound provider and its clients. Idempotent.
    pub async fn disconnect(&self) {
        let mut binding = self.binding.lock().await;
        if binding.detail.is_some() {
            info!("wallet disconnected");
        }
        *binding = Binding::default();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Connect `detail` on the configured network.
    ///
    /// If the wallet already reports the target chain, the provider is bound
    /// without prompting for authorization or switching. Otherwise `connect`
    /// runs, then `switch_chain`. Success is reported through
    /// [`WalletEvents::on_connect`], failure through [`WalletEvents::on_error`].
    pub async fn connect_on_network(&self, detail: &ProviderDetail, events: &dyn WalletEvents) -> Result<ChainMatch> {
        let result = self.match_chain(detail).await;
        match &result {
            Ok(_) => events.on_connect(detail),
            Err(e) => events.on_error(e),
        }
        result
    }

    async fn match_chain(&self, detail: &ProviderDetail) -> Result<ChainMatch> {
        let provider = detail.provider.clone().ok_or(Error::ProviderMissing)?;
        let probe = WalletClient::new(provider, self.network.clone(), self.rpc_timeout);
        let current = probe.chain_id().await?;

        if current == self.network.id {
            let mut binding = self.binding.lock().await;
            if let Err(e) = self.bind(&mut binding, detail) {
                *binding = Binding::default();
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
            self.set_state(ConnectionState::Connected);
            info!(chain_id = current, "wallet already on target chain");
            return Ok(ChainMatch::AlreadyOnChain);
        }

        self.connect(detail).await?;
        self.switch_chain(self.network.id).await?;
        Ok(ChainMatch::Switched)
    }

    /// Account and balance of the connected wallet
    pub async fn account_snapshot(&self) -> Result<Option<AccountSnapshot>> {
        let account = match self.get_account().await? {
            Some(account) => account,
            None => return Ok(None),
        };
        let balance = self.get_balance(account).await?;
        Ok(Some(AccountSnapshot { account, balance }))
    }
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("network", &self.network.id)
            .field("state", &self.state())
            .finish()
    }
}
