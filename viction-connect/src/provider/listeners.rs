//! Listener bookkeeping shared by provider implementations

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::types::{Listener, ListenerId, ProviderEvent, ProviderEventKind};

/// Set of registered notification listeners
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, ProviderEventKind, Listener)>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn add(&self, kind: ProviderEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, kind, listener));
        }
        id
    }

    /// Remove a listener
    pub fn remove(&self, id: ListenerId) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|(existing, _, _)| *existing != id);
                listeners.len() != before
            }
            Err(_) => false,
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener of its kind. Listeners run outside
    /// the lock so they may register or remove listeners themselves.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        let kind = event.kind();
        let matching: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|(_, k, _)| *k == kind)
                .map(|(_, _, l)| l.clone())
                .collect(),
            Err(_) => return 0,
        };

        for listener in &matching {
            listener(event.clone());
        }
        matching.len()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}
