//! Event bridge
//!
//! Subscribes to the account, chain and disconnect notifications of every
//! known provider and forwards those of the provider bound to the connector
//! to the host's [`WalletEvents`]. Notifications from other providers are
//! dropped.
//!
//! Each provider's listeners are held by a [`Subscription`] that is created
//! the first time the provider is seen and removes its listeners when dropped,
//! so re-syncing never registers a handler twice.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use ethers::types::Address;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chains::{parse_chain_id, ChainDescriptor};
use crate::config::ChainMismatchPolicy;
use crate::connector::WalletConnector;
use crate::error::Error;
use crate::provider::{Eip1193Provider, ListenerId, ProviderDetail, ProviderEvent, ProviderEventKind};
use crate::registry::ProviderRegistry;

/// Host callbacks. Every method is optional.
pub trait WalletEvents: Send + Sync {
    fn on_connect(&self, _provider: &ProviderDetail) {}
    fn on_disconnect(&self) {}
    fn on_account_changed(&self, _account: Address) {}
    fn on_chain_changed(&self, _chain: &ChainDescriptor) {}
    fn on_error(&self, _error: &Error) {}
}

/// Callbacks that ignore everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl WalletEvents for NoopEvents {}

struct Subscription {
    provider: Arc<dyn Eip1193Provider>,
    listeners: Vec<ListenerId>,
}

impl Subscription {
    fn open(id: &str, provider: Arc<dyn Eip1193Provider>, sender: &mpsc::UnboundedSender<(String, ProviderEvent)>) -> Self {
        let kinds = [
            ProviderEventKind::AccountsChanged,
            ProviderEventKind::ChainChanged,
            ProviderEventKind::Disconnect,
        ];

        let listeners = kinds
            .into_iter()
            .map(|kind| {
                let sender = sender.clone();
                let source = id.to_string();
                provider.on(
                    kind,
                    Arc::new(move |event: ProviderEvent| {
                        if sender.send((source.clone(), event)).is_err() {
                            debug!("event bridge closed, dropping notification");
                        }
                    }),
                )
            })
            .collect();

        Self { provider, listeners }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for id in self.listeners.drain(..) {
            self.provider.remove_listener(id);
        }
    }
}

type Queued = (String, ProviderEvent);

/// Forwards provider notifications to the host
pub struct EventBridge {
    connector: Arc<WalletConnector>,
    events: Arc<dyn WalletEvents>,
    policy: ChainMismatchPolicy,
    subscriptions: Mutex<HashMap<String, Subscription>>,
    sender: mpsc::UnboundedSender<Queued>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Queued>>>,
}

impl EventBridge {
    pub fn new(connector: Arc<WalletConnector>, events: Arc<dyn WalletEvents>, policy: ChainMismatchPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            connector,
            events,
            policy,
            subscriptions: Mutex::new(HashMap::new()),
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        }
    }

    /// Subscribe to providers not seen before and release subscriptions of
    /// providers that are gone. Providers without an RPC handle are skipped.
    pub fn sync(&self, providers: &[ProviderDetail]) {
        let mut subscriptions = match self.subscriptions.lock() {
            Ok(subscriptions) => subscriptions,
            Err(_) => return,
        };

        let live: HashSet<&str> = providers
            .iter()
            .filter(|d| d.provider.is_some())
            .map(|d| d.id())
            .collect();
        subscriptions.retain(|id, _| {
            let keep = live.contains(id.as_str());
            if !keep {
                debug!(id = %id, "releasing provider subscription");
            }
            keep
        });

        for detail in providers {
            let provider = match &detail.provider {
                Some(provider) => provider.clone(),
                None => continue,
            };
            if subscriptions.contains_key(detail.id()) {
                continue;
            }
            debug!(id = detail.id(), "subscribing to provider notifications");
            let subscription = Subscription::open(detail.id(), provider, &self.sender);
            subscriptions.insert(detail.id().to_string(), subscription);
        }
    }

    /// Identifiers of providers currently subscribed
    pub fn subscribed(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Release every subscription
    pub fn shutdown(&self) {
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            subscriptions.clear();
        }
    }

    /// Handle every queued notification. Returns how many were handled.
    ///
    /// The queue belongs to the [`run`](Self::run) task while it is alive;
    /// draining then handles nothing and returns 0.
    pub async fn drain(&self) -> usize {
        let mut receiver = match self.receiver.try_lock() {
            Ok(receiver) => receiver,
            Err(_) => {
                debug!("event queue is owned by the bridge task");
                return 0;
            }
        };
        let mut handled = 0;
        while let Ok((source, event)) = receiver.try_recv() {
            self.handle(&source, event).await;
            handled += 1;
        }
        handled
    }

    /// Follow the registry and handle notifications until the task is aborted
    pub fn run(self: Arc<Self>, registry: Arc<ProviderRegistry>) -> JoinHandle<()> {
        let mut changes = registry.subscribe_changes();
        self.sync(&registry.all());
        let queue = self.receiver.clone();
        let owned = queue.clone().try_lock_owned();

        tokio::spawn(async move {
            let mut receiver = match owned {
                Ok(receiver) => receiver,
                Err(_) => queue.lock_owned().await,
            };
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        self.sync(&registry.all());
                    }
                    queued = receiver.recv() => {
                        match queued {
                            Some((source, event)) => self.handle(&source, event).await,
                            None => break,
                        }
                    }
                }
            }
        })
    }

    /// Handle one notification from provider `source`. Ignored unless
    /// `source` is the provider bound to the connector.
    pub async fn handle(&self, source: &str, event: ProviderEvent) {
        if self.connector.bound_id().await.as_deref() != Some(source) {
            debug!(source, kind = ?event.kind(), "ignoring notification from unbound provider");
            return;
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(account) => {
                    debug!(source, account = ?account, "accounts changed");
                    self.events.on_account_changed(*account);
                }
                None => {
                    info!(source, "wallet revoked all accounts");
                    self.disconnect().await;
                }
            },
            ProviderEvent::ChainChanged(raw) => {
                let expected = self.connector.network().id;
                match parse_chain_id(&raw) {
                    Ok(chain_id) if chain_id == expected => {
                        self.events.on_chain_changed(self.connector.network());
                    }
                    Ok(chain_id) => {
                        warn!(source, reported = chain_id, expected, "wallet moved to unknown chain");
                        self.events.on_error(&Error::UnknownChain {
                            reported: chain_id,
                            expected,
                        });
                        if self.policy == ChainMismatchPolicy::Disconnect {
                            self.disconnect().await;
                        }
                    }
                    Err(e) => {
                        warn!(source, raw = %raw, "unparseable chain ID");
                        self.events.on_error(&e);
                    }
                }
            }
            ProviderEvent::Disconnect(error) => {
                info!(source, %error, "provider disconnected");
                self.events.on_error(&Error::ProviderDisconnected(error));
                self.disconnect().await;
            }
        }
    }

    async fn disconnect(&self) {
        self.connector.disconnect().await;
        self.events.on_disconnect();
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("policy", &self.policy)
            .field("subscribed", &self.subscribed())
            .finish()
    }
}
