//! # Discovery Flows
//!
//! Chain service lifecycle → NFT discovery → storage and `"/nfts/"`
//! subscribers, driven through the orchestrator.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use shared_types::{AddressOnNetwork, CollectionRecord, MainState, NetworkId};
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use wallet_runtime::wiring::nft_route_params;
    use wallet_runtime::{ImportRequest, Main, NFTS_ROUTE};
    use wb_02_nft_discovery::FetchError;

    use crate::integration::{Harness, ALICE, BOB};

    const WAIT: Duration = Duration::from_secs(5);

    fn account(address: &str) -> AddressOnNetwork {
        AddressOnNetwork::new(address, NetworkId::default())
    }

    fn collection(owner: &AddressOnNetwork, id: &str) -> CollectionRecord {
        CollectionRecord {
            id: id.into(),
            name: id.to_uppercase(),
            owner: owner.clone(),
            item_count: Some(1),
        }
    }

    fn state_tracking(addresses: &[&str]) -> MainState {
        let mut state = MainState::default();
        state.accounts.tracked = addresses.iter().map(|a| account(a)).collect();
        state
    }

    /// Subscribe to `"/nfts/"` for `owner`, forwarding payloads to a channel.
    fn subscribe(main: &Main, owner: &AddressOnNetwork) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        main.register_subscription(NFTS_ROUTE, &nft_route_params(owner), "test", move |v| {
            let _ = tx.send(v.clone());
            Ok(())
        });
        rx
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
        timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for /nfts/ event")
            .expect("subscription channel closed")
    }

    // =========================================================================
    // INITIAL SCAN
    // =========================================================================

    #[tokio::test]
    async fn test_initial_scan_covers_every_tracked_account_once() {
        let harness = Harness::new();
        let (alice, bob) = (account(ALICE), account(BOB));
        harness
            .fetcher
            .set_collections(alice.clone(), Ok(vec![collection(&alice, "punks")]));
        harness
            .fetcher
            .set_collections(bob.clone(), Ok(vec![collection(&bob, "apes")]));

        let main = Main::new(
            state_tracking(&[ALICE, BOB]),
            harness.config.clone(),
            harness.collaborators(),
        );
        let mut alice_events = subscribe(&main, &alice);
        let mut bob_events = subscribe(&main, &bob);

        let event = next_event(&mut alice_events).await;
        assert_eq!(event["event"], "updated");
        assert_eq!(event["kind"], "collections");
        assert_eq!(event["upserted"], 1);
        next_event(&mut bob_events).await;

        assert_eq!(harness.fetcher.collection_requests().len(), 1);
        assert_eq!(harness.store.collections_of(&alice).len(), 1);
        assert_eq!(harness.store.collections_of(&bob).len(), 1);
        main.shutdown().await.unwrap();
        assert!(harness.store.is_closed());
    }

    // =========================================================================
    // FAILURE ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_failed_account_is_reported_and_siblings_still_merge() {
        let harness = Harness::new();
        let (alice, bob) = (account(ALICE), account(BOB));
        harness
            .fetcher
            .set_collections(alice.clone(), Ok(vec![collection(&alice, "punks")]));
        harness
            .fetcher
            .set_collections(bob.clone(), Err(FetchError::Unavailable("503".into())));

        let main = Main::new(
            state_tracking(&[ALICE, BOB]),
            harness.config.clone(),
            harness.collaborators(),
        );
        let mut alice_events = subscribe(&main, &alice);
        let mut bob_events = subscribe(&main, &bob);

        assert_eq!(next_event(&mut alice_events).await["event"], "updated");
        let failure = next_event(&mut bob_events).await;
        assert_eq!(failure["event"], "failed");
        assert!(failure["cause"].as_str().unwrap().contains("503"));
        assert_eq!(failure["collection"], Value::Null);

        assert_eq!(harness.store.collections_of(&alice).len(), 1);
        assert!(harness.store.collections_of(&bob).is_empty());
        main.shutdown().await.unwrap();
    }

    // =========================================================================
    // INCREMENTAL DISCOVERY
    // =========================================================================

    #[tokio::test]
    async fn test_importing_an_address_fetches_only_that_account() {
        let harness = Harness::new();
        let bob = account(BOB);
        harness
            .fetcher
            .set_collections(bob.clone(), Ok(vec![collection(&bob, "apes")]));

        let main = Main::new(
            state_tracking(&[ALICE]),
            harness.config.clone(),
            harness.collaborators(),
        );
        let mut alice_events = subscribe(&main, &account(ALICE));
        next_event(&mut alice_events).await;

        let mut bob_events = subscribe(&main, &bob);
        main.import(ImportRequest::address(BOB)).unwrap();
        next_event(&mut bob_events).await;

        let requests = harness.fetcher.collection_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], vec![bob.clone()]);
        assert_eq!(harness.store.collections_of(&bob).len(), 1);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_discovery_never_fetches() {
        let mut harness = Harness::new();
        harness.config.services.nft_discovery = false;

        let main = Main::new(
            state_tracking(&[ALICE]),
            harness.config.clone(),
            harness.collaborators(),
        );
        main.chain_service.wait().await.unwrap();
        main.import(ImportRequest::address(BOB)).unwrap();
        tokio::task::yield_now().await;

        assert!(harness.fetcher.collection_requests().is_empty());
        main.shutdown().await.unwrap();
        assert!(!harness.store.is_closed());
    }
}
