//! One-time initialization
//!
//! [`WalletKit::init`] wires the discovery bus, the registry, the connector
//! and the event bridge together. Hosts call it once at startup, inside a
//! tokio runtime, and keep the returned kit for the session.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::bridge::{EventBridge, WalletEvents};
use crate::client::{default_reader_factory, ReaderFactory};
use crate::config::ConnectConfig;
use crate::connector::WalletConnector;
use crate::discovery::DiscoveryBus;
use crate::error::Result;
use crate::registry::ProviderRegistry;

/// Initialized connector stack
#[derive(Debug)]
pub struct WalletKit {
    config: ConnectConfig,
    bus: DiscoveryBus,
    registry: Arc<ProviderRegistry>,
    connector: Arc<WalletConnector>,
    bridge: Arc<EventBridge>,
    tasks: Vec<JoinHandle<()>>,
}

impl WalletKit {
    /// Build the stack, start listening for announcements and send the first
    /// discovery request
    pub fn init(config: ConnectConfig, events: Arc<dyn WalletEvents>) -> Result<Self> {
        Self::init_with(config, events, DiscoveryBus::default(), default_reader_factory())
    }

    /// Like [`WalletKit::init`], on a caller-provided bus and read-client factory
    pub fn init_with(
        config: ConnectConfig,
        events: Arc<dyn WalletEvents>,
        bus: DiscoveryBus,
        reader_factory: ReaderFactory,
    ) -> Result<Self> {
        info!(network = %config.network, "initializing wallet kit");

        let registry = Arc::new(ProviderRegistry::new(config.sponsor_rdns.clone()));
        let connector = Arc::new(WalletConnector::with_reader_factory(
            config.network,
            config.rpc_timeout(),
            reader_factory,
        ));
        let bridge = Arc::new(EventBridge::new(connector.clone(), events, config.chain_mismatch));

        let listener = registry.clone().listen(&bus);
        let bridge_task = bridge.clone().run(registry.clone());
        registry.request_announcements(&bus);

        Ok(Self {
            config,
            bus,
            registry,
            connector,
            bridge,
            tasks: vec![listener, bridge_task],
        })
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn bus(&self) -> &DiscoveryBus {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn connector(&self) -> &Arc<WalletConnector> {
        &self.connector
    }

    pub fn bridge(&self) -> &Arc<EventBridge> {
        &self.bridge
    }

    /// Ask wallets to announce themselves again
    pub fn refresh(&self) {
        self.registry.request_announcements(&self.bus);
    }

    /// Stop background tasks, release provider subscriptions and disconnect
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.bridge.shutdown();
        self.connector.disconnect().await;
        info!("wallet kit shut down");
    }
}

impl Drop for WalletKit {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.bridge.shutdown();
    }
}
