//! # Boot Flows
//!
//! Persisted envelope → migration → persisted current envelope → `Main`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use shared_types::{AddressOnNetwork, MainState, NetworkId};
    use wallet_runtime::adapters::{InMemoryPersistence, JsonFilePersistence, StatePersistence};
    use wallet_runtime::{start_api, BootError, Collaborators, ImportRequest, RuntimeConfig};
    use wb_01_state_migration::{MigrationError, CURRENT_VERSION};

    use crate::integration::{Harness, ALICE, BOB};

    // =========================================================================
    // EMPTY AND LEGACY ENVELOPES
    // =========================================================================

    #[tokio::test]
    async fn test_empty_envelope_boots_from_seed_and_persists_current_version() {
        let harness = Harness::new();

        let main = start_api(harness.config.clone(), harness.collaborators())
            .await
            .unwrap();

        let stored = harness.persistence.get("wallet_state").unwrap();
        assert_eq!(stored["version"], json!(CURRENT_VERSION));
        assert_eq!(stored["state"]["accounts"], json!({ "tracked": [] }));
        assert_eq!(main.get_state().accounts, MainState::default().accounts);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_legacy_envelope_is_migrated_before_the_store_is_built() {
        let legacy = json!({
            "version": 1,
            "state": {
                "accounts": { "addresses": [ALICE.to_uppercase().replace("0X", "0x"), BOB] },
                "transactions": { "records": [] },
                "networks": {
                    "selected": "ethereum",
                    "known": [{ "id": "ethereum", "name": "Ethereum", "chain_id": 1 }]
                }
            }
        });
        let harness =
            Harness::with_persistence(InMemoryPersistence::new().with_entry("wallet_state", legacy));

        let main = start_api(harness.config.clone(), harness.collaborators())
            .await
            .unwrap();

        let expected = vec![
            AddressOnNetwork::new(ALICE, NetworkId::default()),
            AddressOnNetwork::new(BOB, NetworkId::default()),
        ];
        assert_eq!(main.get_state().accounts.tracked, expected);
        let chain = main.chain_service.wait().await.unwrap();
        assert_eq!(chain.tracked(), expected);
        main.shutdown().await.unwrap();
    }

    // =========================================================================
    // FATAL MIGRATION ERRORS
    // =========================================================================

    #[tokio::test]
    async fn test_newer_envelope_aborts_boot_and_writes_nothing() {
        let future = json!({ "version": CURRENT_VERSION + 1, "state": {} });
        let harness = Harness::with_persistence(
            InMemoryPersistence::new().with_entry("wallet_state", future.clone()),
        );

        let err = start_api(harness.config.clone(), harness.collaborators())
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            BootError::Migration(MigrationError::UnsupportedDowngrade { .. })
        ));
        assert!(harness.persistence.write_log().is_empty());
        assert_eq!(harness.persistence.get("wallet_state"), Some(future));
    }

    #[tokio::test]
    async fn test_malformed_envelope_aborts_boot() {
        let harness = Harness::with_persistence(
            InMemoryPersistence::new().with_entry("wallet_state", json!({ "version": "three" })),
        );

        let err = start_api(harness.config.clone(), harness.collaborators())
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            BootError::Migration(MigrationError::InvalidEnvelope(_))
        ));
        assert!(harness.persistence.write_log().is_empty());
    }

    // =========================================================================
    // PERSISTENCE ACROSS RESTARTS
    // =========================================================================

    #[tokio::test]
    async fn test_state_changes_survive_a_restart_with_the_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RuntimeConfig::default();
        config.persistence.use_file_store = true;
        config.persistence.data_dir = dir.path().to_path_buf();

        let main = start_api(config.clone(), Collaborators::from_config(&config))
            .await
            .unwrap();
        main.import(ImportRequest::address(ALICE)).unwrap();
        main.shutdown().await.unwrap();
        assert!(dir.path().join("wallet_state.json").exists());

        let restarted = start_api(config.clone(), Collaborators::from_config(&config))
            .await
            .unwrap();
        assert_eq!(
            restarted.get_state().accounts.tracked,
            vec![AddressOnNetwork::new(ALICE, NetworkId::default())]
        );
        restarted.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_every_update_is_persisted_as_a_current_envelope() {
        let backend = Arc::new(InMemoryPersistence::new());
        let config = RuntimeConfig::default();
        let collaborators = Collaborators::in_memory(&config).with_persistence(backend.clone());
        let main = start_api(config, collaborators).await.unwrap();

        main.import(ImportRequest::address(BOB)).unwrap();
        main.connect().await.unwrap();
        main.flush().await;

        let stored = backend.get("wallet_state").unwrap();
        assert_eq!(stored["version"], json!(CURRENT_VERSION));
        assert_eq!(stored["state"]["networks"]["status"], json!("connected"));
        assert_eq!(stored["state"]["accounts"]["tracked"][0]["address"], json!(BOB));
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_reads_what_boot_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(JsonFilePersistence::new(dir.path()));
        let config = RuntimeConfig::default();
        let collaborators = Collaborators::in_memory(&config).with_persistence(persistence.clone());

        let main = start_api(config, collaborators).await.unwrap();
        main.shutdown().await.unwrap();

        let stored = persistence.read("wallet_state").await.unwrap().unwrap();
        assert_eq!(stored["version"], json!(CURRENT_VERSION));
    }
}
