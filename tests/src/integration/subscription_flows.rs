//! # Subscription Flows
//!
//! Registration, ordered delivery and failure containment through the
//! orchestrator's broker.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_types::HandlerError;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use wallet_runtime::{ImportRequest, Main, NFTS_ROUTE, STATE_ROUTE};

    use crate::integration::{Harness, ALICE, BOB};

    fn runtime(harness: &Harness) -> Main {
        Main::new(
            Default::default(),
            harness.config.clone(),
            harness.collaborators(),
        )
    }

    fn recorder(main: &Main, route: &str, params: &Value, id: &str, log: &Arc<Mutex<Vec<String>>>) {
        let log = Arc::clone(log);
        let tag = id.to_string();
        main.register_subscription(route, params, id, move |_| {
            log.lock().push(tag.clone());
            Ok(())
        });
    }

    // =========================================================================
    // SIGNATURES
    // =========================================================================

    #[tokio::test]
    async fn test_same_route_with_different_params_keeps_independent_lists() {
        let main = runtime(&Harness::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let alice = json!({ "address": ALICE, "network": "ethereum" });
        let bob = json!({ "address": BOB, "network": "ethereum" });
        recorder(&main, NFTS_ROUTE, &alice, "a", &log);
        recorder(&main, NFTS_ROUTE, &bob, "b", &log);

        let report = main.broker().publish(NFTS_ROUTE, &bob, &json!({}));

        assert_eq!(report.delivered, 1);
        assert_eq!(*log.lock(), vec!["b"]);
        assert_eq!(main.broker().subscribers(NFTS_ROUTE, &alice), vec!["a"]);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_params_field_order_does_not_split_subscribers() {
        let main = runtime(&Harness::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(
            &main,
            NFTS_ROUTE,
            &json!({ "address": ALICE, "network": "ethereum" }),
            "first",
            &log,
        );

        let mut reordered = serde_json::Map::new();
        reordered.insert("network".into(), json!("ethereum"));
        reordered.insert("address".into(), json!(ALICE));
        let report = main
            .broker()
            .publish(NFTS_ROUTE, &Value::Object(reordered), &json!({}));

        assert_eq!(report.delivered, 1);
        assert_eq!(*log.lock(), vec!["first"]);
        main.shutdown().await.unwrap();
    }

    // =========================================================================
    // ORDERING AND ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_subscribers_fire_in_registration_order_including_duplicates() {
        let main = runtime(&Harness::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let params = json!({ "address": ALICE });
        recorder(&main, NFTS_ROUTE, &params, "x", &log);
        recorder(&main, NFTS_ROUTE, &params, "y", &log);
        recorder(&main, NFTS_ROUTE, &params, "x", &log);

        main.broker().publish(NFTS_ROUTE, &params, &json!(1));

        assert_eq!(*log.lock(), vec!["x", "y", "x"]);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_and_panicking_handlers_do_not_stop_delivery() {
        let main = runtime(&Harness::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let params = json!({ "address": ALICE });
        main.register_subscription(NFTS_ROUTE, &params, "rejects", |_| {
            Err(HandlerError::rejected("closed tab"))
        });
        main.register_subscription(NFTS_ROUTE, &params, "panics", |_| panic!("boom"));
        recorder(&main, NFTS_ROUTE, &params, "healthy", &log);

        let report = main.broker().publish(NFTS_ROUTE, &params, &json!({}));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.failures[0].subscriber, "rejects");
        assert_eq!(
            report.failures[1].error,
            HandlerError::Panicked("boom".into())
        );
        assert_eq!(*log.lock(), vec!["healthy"]);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unregister_removes_every_entry_for_that_id() {
        let main = runtime(&Harness::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let params = json!({ "address": ALICE });
        recorder(&main, NFTS_ROUTE, &params, "x", &log);
        recorder(&main, NFTS_ROUTE, &params, "keep", &log);
        recorder(&main, NFTS_ROUTE, &params, "x", &log);

        assert_eq!(main.unregister_subscription(NFTS_ROUTE, &params, "x"), 2);
        assert_eq!(main.unregister_subscription(NFTS_ROUTE, &params, "x"), 0);
        main.broker().publish(NFTS_ROUTE, &params, &json!({}));

        assert_eq!(*log.lock(), vec!["keep"]);
        main.shutdown().await.unwrap();
    }

    // =========================================================================
    // STATE PUSH
    // =========================================================================

    #[tokio::test]
    async fn test_state_subscribers_see_imported_accounts() {
        let main = runtime(&Harness::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        main.register_subscription(STATE_ROUTE, &json!({}), "ui", move |state| {
            let _ = tx.send(state.clone());
            Ok(())
        });

        main.import(ImportRequest::address(BOB)).unwrap();

        let seen = timeout(Duration::from_secs(5), async {
            while let Some(state) = rx.recv().await {
                if state["accounts"]["tracked"][0]["address"] == json!(BOB) {
                    return true;
                }
            }
            false
        })
        .await
        .expect("timed out waiting for /state/ push");
        assert!(seen);
        main.shutdown().await.unwrap();
    }
}
