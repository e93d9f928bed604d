//! Host callbacks that report wallet activity through tracing

use ethers::types::Address;
use tracing::{error, info};

use viction_connect::{ChainDescriptor, Error, ProviderDetail, WalletEvents};

/// Logs every wallet callback
#[derive(Debug, Default)]
pub struct LogEvents;

impl WalletEvents for LogEvents {
    fn on_connect(&self, provider: &ProviderDetail) {
        info!(wallet = %provider.info.name, id = provider.id(), "connected");
    }

    fn on_disconnect(&self) {
        info!("disconnected");
    }

    fn on_account_changed(&self, account: Address) {
        info!(account = ?account, "account changed");
    }

    fn on_chain_changed(&self, chain: &ChainDescriptor) {
        info!(chain_id = chain.id, name = %chain.name, "chain changed");
    }

    fn on_error(&self, err: &Error) {
        error!(error = %err, "wallet error");
    }
}
