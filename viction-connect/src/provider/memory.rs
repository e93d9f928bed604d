//! Deterministic in-memory provider

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use serde_json::{json, Value};

use crate::chains::parse_chain_id;
use super::listeners::ListenerSet;
use super::types::{codes, methods, Listener, ListenerId, ProviderEvent, ProviderEventKind, RpcError};
use super::{Eip1193Provider, ProviderDetail, ProviderInfo};

#[derive(Debug)]
struct MemoryState {
    chain_id: u64,
    accounts: Vec<Address>,
    known_chains: HashSet<u64>,
    failures: HashMap<String, RpcError>,
    stalled: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Vec<String>,
}

/// Wallet simulator with programmable accounts, chain and failures.
///
/// Every request is appended to a call log, which makes it convenient for
/// asserting the exact RPC sequence a host issues.
#[derive(Debug)]
pub struct InMemoryProvider {
    state: Mutex<MemoryState>,
    supported_chain: Option<u64>,
    listeners: ListenerSet,
}

impl InMemoryProvider {
    pub fn new(chain_id: u64, accounts: Vec<Address>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                chain_id,
                accounts,
                known_chains: HashSet::from([chain_id]),
                failures: HashMap::new(),
                stalled: HashSet::new(),
                delays: HashMap::new(),
                calls: Vec::new(),
            }),
            supported_chain: None,
            listeners: ListenerSet::new(),
        }
    }

    /// Restrict the wallet to a single chain
    pub fn with_supported_chain(mut self, chain_id: u64) -> Self {
        self.supported_chain = Some(chain_id);
        self
    }

    /// Answer `method` with a user-rejection error from now on
    pub fn reject(&self, method: &str) {
        self.fail(method, RpcError::user_rejected());
    }

    /// Answer `method` with `error` from now on
    pub fn fail(&self, method: &str, error: RpcError) {
        self.lock().failures.insert(method.to_string(), error);
    }

    /// Never answer `method`
    pub fn stall(&self, method: &str) {
        self.lock().stalled.insert(method.to_string());
    }

    /// Answer `method` only after `delay`
    pub fn delay(&self, method: &str, delay: Duration) {
        self.lock().delays.insert(method.to_string(), delay);
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.lock().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        let mut state = self.lock();
        state.chain_id = chain_id;
        state.known_chains.insert(chain_id);
    }

    pub fn chain_id(&self) -> u64 {
        self.lock().chain_id
    }

    /// Methods requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Deliver a notification to registered listeners
    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.listeners.emit(event)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Wrap the provider in an announceable detail
    pub fn into_detail(self: Arc<Self>, uuid: &str, name: &str, rdns: Option<&str>) -> ProviderDetail {
        let accounts = self.lock().accounts.clone();
        let info = ProviderInfo {
            uuid: uuid.to_string(),
            name: name.to_string(),
            icon: String::new(),
            rdns: rdns.map(str::to_string),
        };
        let mut detail = ProviderDetail::new(info, self);
        detail.accounts = accounts;
        detail
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned simulator is still usable; the state is plain data.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn requested_chain(params: &Value) -> Result<u64, RpcError> {
        let raw = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(codes::INTERNAL_ERROR, "Missing chainId parameter"))?;
        parse_chain_id(raw).map_err(|e| RpcError::new(codes::INTERNAL_ERROR, e.to_string()))
    }
}

#[async_trait]
impl Eip1193Provider for InMemoryProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let (failure, stalled, delay) = {
            let mut state = self.lock();
            state.calls.push(method.to_string());
            (
                state.failures.get(method).cloned(),
                state.stalled.contains(method),
                state.delays.get(method).copied(),
            )
        };

        if stalled {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }

        match method {
            methods::CHAIN_ID => Ok(json!(format!("{:#x}", self.lock().chain_id))),
            methods::ACCOUNTS | methods::REQUEST_ACCOUNTS => {
                let accounts: Vec<String> = self
                    .lock()
                    .accounts
                    .iter()
                    .map(|a| format!("{:?}", a))
                    .collect();
                Ok(json!(accounts))
            }
            methods::ADD_CHAIN => {
                let chain_id = Self::requested_chain(&params)?;
                self.lock().known_chains.insert(chain_id);
                Ok(Value::Null)
            }
            methods::SWITCH_CHAIN => {
                let chain_id = Self::requested_chain(&params)?;
                {
                    let mut state = self.lock();
                    if !state.known_chains.contains(&chain_id) {
                        return Err(RpcError::new(
                            codes::UNRECOGNIZED_CHAIN,
                            format!("Unrecognized chain ID {:#x}", chain_id),
                        ));
                    }
                    state.chain_id = chain_id;
                }
                self.listeners
                    .emit(ProviderEvent::ChainChanged(format!("{:#x}", chain_id)));
                Ok(Value::Null)
            }
            methods::SEND_TRANSACTION => {
                let hash = H256::from(keccak256(params.to_string().as_bytes()));
                Ok(json!(format!("{:?}", hash)))
            }
            other => Err(RpcError::new(
                codes::UNSUPPORTED_METHOD,
                format!("Method {} is not supported", other),
            )),
        }
    }

    fn on(&self, kind: ProviderEventKind, listener: Listener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn supported_chain(&self) -> Option<u64> {
        self.supported_chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_switch_requires_known_chain() {
        let provider = InMemoryProvider::new(1, vec![]);

        let err = provider
            .request(methods::SWITCH_CHAIN, json!([{ "chainId": "0x58" }]))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::UNRECOGNIZED_CHAIN);

        provider
            .request(methods::ADD_CHAIN, json!([{ "chainId": "0x58" }]))
            .await
            .unwrap();
        provider
            .request(methods::SWITCH_CHAIN, json!([{ "chainId": "0x58" }]))
            .await
            .unwrap();
        assert_eq!(provider.chain_id(), 88);
    }

    #[tokio::test]
    async fn test_rejected_method() {
        let provider = InMemoryProvider::new(88, vec![Address::repeat_byte(1)]);
        provider.reject(methods::REQUEST_ACCOUNTS);

        let err = provider
            .request(methods::REQUEST_ACCOUNTS, json!([]))
            .await
            .unwrap_err();
        assert!(err.is_user_rejection());
        assert_eq!(provider.calls(), vec![methods::REQUEST_ACCOUNTS.to_string()]);
    }

    #[tokio::test]
    async fn test_delayed_method_suspends() {
        let provider = InMemoryProvider::new(88, vec![]);
        provider.delay(methods::CHAIN_ID, Duration::from_millis(50));

        let started = std::time::Instant::now();
        provider.request(methods::CHAIN_ID, json!([])).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_failed_method_returns_configured_error() {
        let provider = InMemoryProvider::new(88, vec![]);
        provider.fail(methods::REQUEST_ACCOUNTS, RpcError::new(codes::INTERNAL_ERROR, "boom"));

        let err = provider
            .request(methods::REQUEST_ACCOUNTS, json!([]))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INTERNAL_ERROR);
        assert!(!err.is_user_rejection());
    }
}
