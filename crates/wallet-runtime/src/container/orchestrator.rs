//! # Orchestrator
//!
//! `Main` owns the aggregate store and every subsystem, wires their update
//! streams and is the single entry point for external callers.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: store, broker, state writer
//! Phase 2: networks → transactions → accounts → keys
//! Phase 3: update routing (each subsystem replaces its own key)
//! Phase 4: background services, exposed as handles
//!          preferences → indexing
//!          chain → nfts
//! ```
//!
//! Construction never waits on a background service. Listeners a service
//! needs are attached inside its construction future, before `start()`, so
//! no early emission is missed.

use std::sync::Arc;

use serde_json::Value;
use shared_bus::{
    start_service, DomainService, ObservableStore, ServiceHandle, SubscriptionBroker,
};
use shared_types::{HandlerError, MainState, ServiceError, StatePatch};
use tracing::{debug, info, instrument, warn};
use wb_02_nft_discovery::NftsService;

use crate::adapters::StatePersister;
use crate::api::{api_descriptor, ApiDescriptor, ImportRequest};
use crate::boot::Collaborators;
use crate::container::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::subsystems::{
    Accounts, ChainService, IndexingService, Keys, Networks, PreferenceService, Transactions,
};
use crate::wiring::{
    route_accounts_to_chain, route_nft_events, route_state_out, route_subsystem_updates,
    route_tokens_to_state,
};

/// The wallet's background composition root.
pub struct Main {
    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    state: Arc<ObservableStore<MainState>>,
    broker: Arc<SubscriptionBroker>,
    persister: Arc<StatePersister>,

    // =========================================================================
    // SYNCHRONOUS SUBSYSTEMS
    // =========================================================================
    pub networks: Arc<Networks>,
    pub transactions: Arc<Transactions>,
    pub accounts: Arc<Accounts>,
    /// Reachable only through [`Main::import`].
    keys: Keys,

    // =========================================================================
    // BACKGROUND SERVICES
    // =========================================================================
    /// Dependency of most other services.
    pub preference_service: ServiceHandle<PreferenceService>,
    /// Tracked fungible assets; waits on preferences.
    pub indexing_service: ServiceHandle<IndexingService>,
    pub chain_service: ServiceHandle<ChainService>,
    /// Absent when asset discovery is disabled.
    pub nfts_service: Option<ServiceHandle<NftsService>>,

    config: RuntimeConfig,
}

impl Main {
    /// Build every subsystem from an already migrated state record.
    ///
    /// Must be called inside a Tokio runtime: background services and the
    /// state writer are spawned onto it.
    #[instrument(name = "main_init", skip_all)]
    pub fn new(initial: MainState, config: RuntimeConfig, collaborators: Collaborators) -> Self {
        info!("Initializing wallet runtime");
        let Collaborators {
            persistence,
            connection,
            price_lookup,
            nft_fetcher,
            nft_store,
        } = collaborators;

        // =====================================================================
        // PHASE 1: Shared Infrastructure
        // =====================================================================
        info!("Phase 1: Creating store, broker and state writer");
        let state = ObservableStore::shared(initial.clone());
        let broker = Arc::new(SubscriptionBroker::new());
        let persister = Arc::new(StatePersister::spawn(
            Arc::clone(&persistence),
            config.persistence.state_key.clone(),
        ));

        // =====================================================================
        // PHASE 2: Synchronous Subsystems
        // =====================================================================
        info!("Phase 2: Building subsystems");
        let MainState {
            accounts,
            transactions,
            networks,
            ..
        } = initial;
        let networks = Networks::new(networks, Arc::clone(&connection));
        info!(network = %connection.network().id, "  networks ready");
        let transactions = Transactions::new(transactions, Arc::clone(&connection), price_lookup);
        info!("  transactions ready");
        let accounts = Accounts::new(accounts, Arc::clone(&connection), transactions.history_lookup());
        info!(tracked = accounts.tracked().len(), "  accounts ready");
        let keys = Keys::new();

        // =====================================================================
        // PHASE 3: Update Routing
        // =====================================================================
        info!("Phase 3: Routing subsystem updates");
        route_subsystem_updates(&state, &networks, &transactions, &accounts);
        route_state_out(&state, Arc::clone(&broker), Arc::clone(&persister));
        // The network subsystem resets the stale persisted status.
        if state.get_state().networks != networks.state() {
            state.update_state(StatePatch::networks(networks.state()));
        }

        // =====================================================================
        // PHASE 4: Background Services
        // =====================================================================
        info!("Phase 4: Starting background services");
        let preference_service = start_service(PreferenceService::create(
            persistence,
            config.persistence.preferences_key.clone(),
        ));

        let indexing_service = start_service({
            let preferences = preference_service.clone();
            let state = Arc::clone(&state);
            async move {
                let indexing = IndexingService::create(preferences).await?;
                route_tokens_to_state(&indexing, state);
                Ok::<_, ServiceError>(indexing)
            }
        });

        let chain_service = start_service({
            let accounts = Arc::clone(&accounts);
            let connection = Arc::clone(&connection);
            async move {
                let chain = ChainService::create(accounts.tracked(), connection).await?;
                route_accounts_to_chain(&accounts, Arc::clone(&chain));
                // Accounts added while the chain was being built.
                for account in accounts.tracked() {
                    chain.add_account_to_track(account);
                }
                Ok::<_, ServiceError>(chain)
            }
        });

        let nfts_service = if config.services.nft_discovery {
            let chain = chain_service.clone();
            let broker = Arc::clone(&broker);
            Some(start_service(async move {
                let store = async move { Ok::<_, ServiceError>(nft_store) };
                let nfts = NftsService::create(store, chain, nft_fetcher).await?;
                route_nft_events(&nfts, broker);
                Ok::<_, ServiceError>(nfts)
            }))
        } else {
            info!("  asset discovery disabled");
            None
        };

        info!("Wallet runtime initialized");
        Self {
            state,
            broker,
            persister,
            networks,
            transactions,
            accounts,
            keys,
            preference_service,
            indexing_service,
            chain_service,
            nfts_service,
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Snapshot of the aggregate state.
    pub fn get_state(&self) -> MainState {
        self.state.get_state()
    }

    /// The aggregate store, for in-process listeners.
    pub fn store(&self) -> &ObservableStore<MainState> {
        &self.state
    }

    pub fn broker(&self) -> &SubscriptionBroker {
        &self.broker
    }

    /// Route → supported operations.
    pub fn get_api(&self) -> ApiDescriptor {
        api_descriptor()
    }

    /// Open the selected network connection. A no-op when already open.
    pub async fn connect(&self) -> Result<(), RuntimeError> {
        self.networks.selected().open().await?;
        Ok(())
    }

    /// Close the selected network connection. A no-op when already closed.
    pub async fn disconnect(&self) -> Result<(), RuntimeError> {
        self.networks.selected().close().await?;
        Ok(())
    }

    /// Import key material, or start tracking an address.
    ///
    /// Returns the address that was imported or tracked.
    pub fn import(&self, request: ImportRequest) -> Result<String, RuntimeError> {
        if let Some(key) = request.key_material() {
            debug!(kind = ?key.kind, "Import dispatched to key management");
            return Ok(self.keys.import(key)?);
        }
        match request.address.as_deref() {
            Some(address) => {
                debug!("Import dispatched to accounts");
                Ok(self.accounts.add(address)?.address)
            }
            None => Err(RuntimeError::EmptyImport),
        }
    }

    /// Append a subscriber to the list for `(route, params)`.
    ///
    /// The same `id` may be registered more than once.
    pub fn register_subscription<F>(&self, route: &str, params: &Value, id: &str, handler: F)
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.broker.register(route, params, id, handler);
    }

    /// Remove every subscriber registered under `id` for `(route, params)`.
    pub fn unregister_subscription(&self, route: &str, params: &Value, id: &str) -> usize {
        self.broker.unregister(route, params, id)
    }

    /// Wait until every state write queued so far has been persisted.
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    /// Stop background services in reverse start order, close the
    /// connection and drain the state writer.
    ///
    /// Every step runs; the first failure is returned.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        info!("Shutting down wallet runtime");
        let mut first_error: Option<RuntimeError> = None;
        let mut record = |result: Result<(), ServiceError>| {
            if let Err(e) = result {
                warn!(error = %e, "Shutdown step failed");
                first_error.get_or_insert(RuntimeError::Service(e));
            }
        };

        if let Some(nfts) = &self.nfts_service {
            record(stop_handle(nfts).await);
        }
        record(stop_handle(&self.chain_service).await);
        record(stop_handle(&self.indexing_service).await);
        record(stop_handle(&self.preference_service).await);

        if let Err(e) = self.disconnect().await {
            warn!(error = %e, "Failed to close connection");
            first_error.get_or_insert(e);
        }
        self.persister.close().await;
        info!("Wallet runtime stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Stop the service behind `handle`. A service that never became ready has
/// nothing to stop.
async fn stop_handle<S>(handle: &ServiceHandle<S>) -> Result<(), ServiceError>
where
    S: DomainService + 'static,
{
    match handle.wait().await {
        Ok(service) => service.stop().await,
        Err(e) => {
            debug!(error = %e, "Service never started; nothing to stop");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::STATE_ROUTE;
    use crate::subsystems::KeyKind;
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_types::ConnectionStatus;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn main_with(config: RuntimeConfig) -> Main {
        let collaborators = Collaborators::in_memory(&config);
        Main::new(MainState::default(), config, collaborators)
    }

    fn runtime() -> Main {
        main_with(RuntimeConfig::default())
    }

    #[tokio::test]
    async fn test_import_dispatches_by_intent() {
        let main = runtime();

        let tracked = main.import(ImportRequest::address(ALICE)).unwrap();
        assert_eq!(tracked, ALICE);
        assert_eq!(main.get_state().accounts.tracked.len(), 1);

        let mut both = ImportRequest::key(KeyKind::PrivateKey, KEY);
        both.address = Some(ALICE.into());
        let derived = main.import(both).unwrap();
        assert_ne!(derived, ALICE);
        // Key imports do not touch the tracked set.
        assert_eq!(main.get_state().accounts.tracked.len(), 1);

        assert!(matches!(
            main.import(ImportRequest::default()),
            Err(RuntimeError::EmptyImport)
        ));
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_are_reentrant() {
        let main = runtime();

        main.connect().await.unwrap();
        main.connect().await.unwrap();
        assert_eq!(main.get_state().networks.status, ConnectionStatus::Connected);

        main.disconnect().await.unwrap();
        main.disconnect().await.unwrap();
        assert_eq!(main.get_state().networks.status, ConnectionStatus::Disconnected);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_subscribers_fire_in_registration_order() {
        let main = runtime();
        // Let the indexing service publish its initial tokens first.
        main.indexing_service.wait().await.unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in ["first", "second", "first"] {
            let order = Arc::clone(&order);
            main.register_subscription(STATE_ROUTE, &json!({}), id, move |_| {
                order.lock().push(id);
                Ok(())
            });
        }

        main.import(ImportRequest::address(ALICE)).unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "first"]);

        assert_eq!(main.unregister_subscription(STATE_ROUTE, &json!({}), "first"), 2);
        order.lock().clear();
        main.connect().await.unwrap();
        assert_eq!(*order.lock(), vec!["second"]);
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_background_services_resolve() {
        let main = runtime();

        main.preference_service.wait().await.unwrap();
        let indexing = main.indexing_service.wait().await.unwrap();
        main.chain_service.wait().await.unwrap();
        main.nfts_service.as_ref().unwrap().wait().await.unwrap();

        assert_eq!(main.get_state().tokens_to_track, indexing.tokens());
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_new_accounts_reach_the_chain_service() {
        let main = runtime();
        let chain = main.chain_service.wait().await.unwrap();

        main.import(ImportRequest::address(ALICE)).unwrap();

        assert_eq!(chain.tracked(), main.accounts.tracked());
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_discovery_can_be_disabled() {
        let mut config = RuntimeConfig::default();
        config.services.nft_discovery = false;
        let main = main_with(config);

        assert!(main.nfts_service.is_none());
        main.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_services_in_reverse_order() {
        let main = runtime();
        let order = Arc::new(Mutex::new(Vec::new()));
        let nfts = main.nfts_service.as_ref().unwrap().wait().await.unwrap();
        let chain = main.chain_service.wait().await.unwrap();
        let indexing = main.indexing_service.wait().await.unwrap();
        let preferences = main.preference_service.wait().await.unwrap();
        for (name, stopped) in [
            ("nfts", &nfts.lifecycle().service_stopped),
            ("chain", &chain.lifecycle().service_stopped),
            ("indexing", &indexing.lifecycle().service_stopped),
            ("preferences", &preferences.lifecycle().service_stopped),
        ] {
            let order = Arc::clone(&order);
            stopped.once(move |_| order.lock().push(name));
        }

        main.shutdown().await.unwrap();

        assert_eq!(
            *order.lock(),
            vec!["nfts", "chain", "indexing", "preferences"]
        );
    }

    #[tokio::test]
    async fn test_get_api_lists_routes() {
        let main = runtime();
        let api = main.get_api();
        assert!(api.contains_key(STATE_ROUTE));
        assert!(api.contains_key(crate::api::NFTS_ROUTE));
        main.shutdown().await.unwrap();
    }
}
