//! Tests for provider discovery and registration

mod common;

use std::sync::Arc;
use std::time::Duration;

use viction_connect::provider::InMemoryProvider;
use viction_connect::{DiscoveryBus, ProviderKind, ProviderRegistry};

const SPONSOR: &str = "world.abstraction.wallet";

fn announce(registry: &ProviderRegistry, uuid: &str, rdns: Option<&str>) -> bool {
    let detail = Arc::new(InMemoryProvider::new(88, vec![])).into_detail(uuid, uuid, rdns);
    registry.announce(detail)
}

#[test]
fn test_distinct_identifiers_are_all_registered() {
    let registry = ProviderRegistry::new(SPONSOR);
    let ids = ["a", "b", "c", "d", "e"];

    for (i, id) in ids.iter().enumerate() {
        let rdns = if i % 2 == 0 { Some(SPONSOR) } else { Some("io.metamask") };
        assert!(announce(&registry, id, rdns));
    }

    assert_eq!(registry.list().len() + registry.list_sponsors().len(), ids.len());
    assert_eq!(registry.list_sponsors().len(), 3);
}

#[test]
fn test_reannouncement_is_idempotent() {
    let registry = ProviderRegistry::new(SPONSOR);

    assert!(announce(&registry, "wallet-1", Some(SPONSOR)));
    // Same identifier, different pool: still a duplicate.
    assert!(!announce(&registry, "wallet-1", None));
    assert!(!announce(&registry, "wallet-1", Some(SPONSOR)));

    assert_eq!(registry.list_sponsors().len(), 1);
    assert!(registry.list().is_empty());
    assert_eq!(registry.kind_of("wallet-1"), Some(ProviderKind::Sponsor));
}

#[test]
fn test_insertion_order_preserved() {
    let registry = ProviderRegistry::new(SPONSOR);
    for id in ["z", "a", "m"] {
        announce(&registry, id, None);
    }

    let ids: Vec<String> = registry.list().iter().map(|d| d.id().to_string()).collect();
    assert_eq!(ids, vec!["z", "a", "m"]);
}

#[test]
fn test_snapshots_are_by_value() {
    let registry = ProviderRegistry::new(SPONSOR);
    announce(&registry, "a", None);

    let snapshot = registry.list();
    announce(&registry, "b", None);

    assert_eq!(snapshot.len(), 1);
    assert_eq!(registry.list().len(), 2);
}

#[test]
fn test_remove_then_reannounce() {
    let registry = ProviderRegistry::new(SPONSOR);
    announce(&registry, "a", None);

    assert!(registry.remove("a").is_some());
    assert!(registry.get("a").is_none());
    assert!(announce(&registry, "a", Some(SPONSOR)));
    assert_eq!(registry.kind_of("a"), Some(ProviderKind::Sponsor));
}

#[tokio::test]
async fn test_discovery_handshake() {
    let bus = DiscoveryBus::new(16);
    let registry = Arc::new(ProviderRegistry::new(SPONSOR));
    let listener = registry.clone().listen(&bus);

    let sponsor = Arc::new(InMemoryProvider::new(88, vec![])).into_detail("s-1", "Sponsor", Some(SPONSOR));
    let general = Arc::new(InMemoryProvider::new(1, vec![])).into_detail("g-1", "General", Some("io.metamask"));
    let wallets = vec![bus.serve(sponsor), bus.serve(general)];

    // Answers to the request duplicate the initial announcements.
    registry.request_announcements(&bus);

    let mut changes = registry.subscribe_changes();
    tokio::time::timeout(Duration::from_secs(1), async {
        while registry.len() < 2 {
            changes.changed().await.unwrap();
        }
    })
    .await
    .expect("both wallets should be discovered");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.list_sponsors()[0].id(), "s-1");
    assert_eq!(registry.list()[0].id(), "g-1");

    for wallet in wallets {
        wallet.abort();
    }
    listener.abort();
}
