//! Provider registry
//!
//! Collects announced wallets, keyed by identifier, and classifies each one
//! as a sponsor or general wallet at registration time.

use std::sync::{Arc, RwLock};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::discovery::{DiscoveryBus, DiscoveryMessage};
use crate::provider::ProviderDetail;

/// Pool a provider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Trusted wallet, identified by its registration domain
    Sponsor,
    General,
}

#[derive(Debug, Clone)]
struct Entry {
    kind: ProviderKind,
    detail: ProviderDetail,
}

/// Registry of announced providers
#[derive(Debug)]
pub struct ProviderRegistry {
    sponsor_rdns: String,
    entries: RwLock<Vec<Entry>>,
    changes: watch::Sender<u64>,
}

impl ProviderRegistry {
    pub fn new(sponsor_rdns: impl Into<String>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            sponsor_rdns: sponsor_rdns.into(),
            entries: RwLock::new(Vec::new()),
            changes,
        }
    }

    /// Classify a detail by its registration domain
    pub fn classify(&self, detail: &ProviderDetail) -> ProviderKind {
        match detail.info.rdns.as_deref() {
            Some(rdns) if rdns == self.sponsor_rdns => ProviderKind::Sponsor,
            _ => ProviderKind::General,
        }
    }

    /// Register an announced provider. Returns false when the identifier is
    /// empty or already registered in either pool.
    pub fn announce(&self, detail: ProviderDetail) -> bool {
        if detail.id().is_empty() {
            debug!("ignoring announcement without identifier");
            return false;
        }

        let kind = self.classify(&detail);
        {
            let mut entries = match self.entries.write() {
                Ok(entries) => entries,
                Err(_) => return false,
            };
            if entries.iter().any(|e| e.detail.id() == detail.id()) {
                debug!(id = detail.id(), "provider already registered");
                return false;
            }
            info!(id = detail.id(), name = %detail.info.name, ?kind, "provider registered");
            entries.push(Entry { kind, detail });
        }

        self.changes.send_modify(|version| *version += 1);
        true
    }

    /// Unregister a provider
    pub fn remove(&self, id: &str) -> Option<ProviderDetail> {
        let removed = {
            let mut entries = self.entries.write().ok()?;
            let index = entries.iter().position(|e| e.detail.id() == id)?;
            entries.remove(index).detail
        };

        info!(id, "provider removed");
        self.changes.send_modify(|version| *version += 1);
        Some(removed)
    }

    /// Snapshot of general wallets, in announcement order
    pub fn list(&self) -> Vec<ProviderDetail> {
        self.snapshot(Some(ProviderKind::General))
    }

    /// Snapshot of sponsor wallets, in announcement order
    pub fn list_sponsors(&self) -> Vec<ProviderDetail> {
        self.snapshot(Some(ProviderKind::Sponsor))
    }

    /// Snapshot of every provider, in announcement order
    pub fn all(&self) -> Vec<ProviderDetail> {
        self.snapshot(None)
    }

    pub fn get(&self, id: &str) -> Option<ProviderDetail> {
        self.entries
            .read()
            .ok()?
            .iter()
            .find(|e| e.detail.id() == id)
            .map(|e| e.detail.clone())
    }

    pub fn kind_of(&self, id: &str) -> Option<ProviderKind> {
        self.entries
            .read()
            .ok()?
            .iter()
            .find(|e| e.detail.id() == id)
            .map(|e| e.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that changes every time the provider set changes
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Broadcast a discovery request. Answers arrive later, through
    /// [`ProviderRegistry::listen`].
    pub fn request_announcements(&self, bus: &DiscoveryBus) {
        debug!("requesting provider announcements");
        bus.request_providers();
    }

    /// Consume announcements from the bus until it closes
    pub fn listen(self: Arc<Self>, bus: &DiscoveryBus) -> JoinHandle<()> {
        let mut receiver = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(DiscoveryMessage::AnnounceProvider(detail)) => {
                        self.announce(detail);
                    }
                    Ok(DiscoveryMessage::RequestProvider) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "dropped provider announcements");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn snapshot(&self, kind: Option<ProviderKind>) -> Vec<ProviderDetail> {
        match self.entries.read() {
            Ok(entries) => entries
                .iter()
                .filter(|e| kind.map_or(true, |k| e.kind == k))
                .map(|e| e.detail.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SPONSOR_RDNS)
    }
}
