//! EIP-6963 style discovery channel
//!
//! Hosts broadcast [`DiscoveryMessage::RequestProvider`]; every wallet on the
//! bus answers independently with [`DiscoveryMessage::AnnounceProvider`].
//! There is no acknowledgement and no ordering between answers.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::provider::ProviderDetail;

/// Message envelope carried on the discovery bus
#[derive(Debug, Clone)]
pub enum DiscoveryMessage {
    /// Ask every wallet to announce itself
    RequestProvider,
    /// A wallet announcing itself
    AnnounceProvider(ProviderDetail),
}

/// Process-wide announce/request channel, injectable for tests
#[derive(Debug, Clone)]
pub struct DiscoveryBus {
    sender: broadcast::Sender<DiscoveryMessage>,
}

impl DiscoveryBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryMessage> {
        self.sender.subscribe()
    }

    /// Broadcast a discovery request. Fire-and-forget.
    pub fn request_providers(&self) {
        self.publish(DiscoveryMessage::RequestProvider);
    }

    /// Broadcast an announcement
    pub fn announce(&self, detail: ProviderDetail) {
        self.publish(DiscoveryMessage::AnnounceProvider(detail));
    }

    /// Wallet side of the handshake: announce once now, then again on every
    /// request seen on the bus.
    pub fn serve(&self, detail: ProviderDetail) -> JoinHandle<()> {
        let bus = self.clone();
        let mut receiver = self.subscribe();
        bus.announce(detail.clone());

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(DiscoveryMessage::RequestProvider) => bus.announce(detail.clone()),
                    Ok(DiscoveryMessage::AnnounceProvider(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "wallet fell behind on discovery requests");
                        bus.announce(detail.clone());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn publish(&self, message: DiscoveryMessage) {
        if self.sender.send(message).is_err() {
            debug!("no discovery subscribers");
        }
    }
}

impl Default for DiscoveryBus {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DISCOVERY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::provider::InMemoryProvider;

    #[tokio::test]
    async fn test_serve_answers_requests() {
        let bus = DiscoveryBus::new(16);
        let mut receiver = bus.subscribe();

        let detail = Arc::new(InMemoryProvider::new(88, vec![])).into_detail("w-1", "Wallet", None);
        let handle = bus.serve(detail);

        // initial announcement
        match receiver.recv().await.unwrap() {
            DiscoveryMessage::AnnounceProvider(d) => assert_eq!(d.id(), "w-1"),
            other => panic!("unexpected message: {:?}", other),
        }

        bus.request_providers();
        assert!(matches!(receiver.recv().await.unwrap(), DiscoveryMessage::RequestProvider));
        match receiver.recv().await.unwrap() {
            DiscoveryMessage::AnnounceProvider(d) => assert_eq!(d.id(), "w-1"),
            other => panic!("unexpected message: {:?}", other),
        }

        handle.abort();
    }
}
