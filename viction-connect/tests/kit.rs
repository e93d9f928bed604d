//! End-to-end tests through the initialized kit

mod common;

use std::sync::Arc;
use std::time::Duration;

use ethers::types::U256;

use common::{account, fixed_reader, wallet, Callback, RecordingEvents};
use viction_connect::provider::ProviderEvent;
use viction_connect::{ChainMatch, ConnectConfig, DiscoveryBus, Network, WalletKit};

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_discover_connect_and_follow_wallet() {
    let bus = DiscoveryBus::new(16);
    let events = Arc::new(RecordingEvents::default());
    let config = ConnectConfig {
        network: Network::Mainnet,
        rpc_timeout_ms: 500,
        ..ConnectConfig::default()
    };

    let sponsor = wallet(1);
    let sponsor_detail = sponsor
        .clone()
        .into_detail("sponsor-1", "Abstraction Wallet", Some("world.abstraction.wallet"));
    let wallet_task = bus.serve(sponsor_detail);

    let kit = WalletKit::init_with(config, events.clone(), bus, fixed_reader(U256::exp10(18))).unwrap();
    let registry = kit.registry().clone();
    wait_until(|| registry.list_sponsors().len() == 1).await;
    wait_until(|| sponsor.listener_count() == 3).await;

    let chosen = kit.registry().list_sponsors()[0].clone();
    let outcome = kit
        .connector()
        .connect_on_network(&chosen, events.as_ref())
        .await
        .unwrap();
    assert_eq!(outcome, ChainMatch::Switched);

    let snapshot = kit.connector().account_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.account, account());
    assert_eq!(snapshot.balance, "1");

    // The switch itself emits chainChanged for the target network.
    wait_until(|| events.calls().contains(&Callback::ChainChanged(88))).await;

    sponsor.emit(ProviderEvent::AccountsChanged(vec![]));
    wait_until(|| events.calls().contains(&Callback::Disconnect)).await;
    assert!(!kit.connector().is_connected().await);

    kit.shutdown().await;
    assert_eq!(sponsor.listener_count(), 0);
    wallet_task.abort();
}

#[tokio::test]
async fn test_refresh_reaches_late_wallets() {
    let bus = DiscoveryBus::new(16);
    let events = Arc::new(RecordingEvents::default());
    let kit = WalletKit::init_with(
        ConnectConfig::default(),
        events,
        bus.clone(),
        fixed_reader(U256::zero()),
    )
    .unwrap();

    let late = wallet(88);
    let mut receiver = bus.subscribe();
    let handle = bus.serve(late.clone().into_detail("late", "Late Wallet", None));

    kit.refresh();
    let registry = kit.registry().clone();
    wait_until(|| registry.get("late").is_some()).await;
    assert_eq!(kit.registry().list().len(), 1);
    assert!(receiver.try_recv().is_ok());

    handle.abort();
    kit.shutdown().await;
}
