//! # NFT Discovery Service
//!
//! Reacts to the chain service's lifecycle and account signals, fans out
//! fetch operations and merges each result into storage as it completes.
//!
//! ## Per-account phases
//!
//! ```text
//! Idle → CollectionsFetching → CollectionsFetched → ItemsFetching → ItemsFetched
//!   ↑              │                                        │
//!   └── failure ───┴────────────────────────────────────────┘
//! ```
//!
//! A completed phase is kept until the next trigger for that account moves
//! it back to a fetching phase; only a failed operation returns to `Idle`.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use shared_bus::{DomainService, ListenerId, ServiceHandle, ServiceLifecycle, Signal};
use shared_types::{AddressOnNetwork, ServiceError};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    CursorBook, DiscoveryPhase, FetchOrigin, FetchSummary, ItemsPage, NftFetchFailure,
    NftStoreError, NftUpdate, UpdateKind,
};
use crate::ports::{ChainTracker, NftFetcher, NftStore, PendingFetch};

const SERVICE: &str = "nfts";

struct ChainListeners {
    started: Option<ListenerId>,
    new_account: Option<ListenerId>,
}

/// Asset-discovery pipeline.
pub struct NftsService {
    me: Weak<NftsService>,
    lifecycle: ServiceLifecycle,
    store: Arc<dyn NftStore>,
    chain: Arc<dyn ChainTracker>,
    fetcher: Arc<dyn NftFetcher>,
    cursors: Mutex<CursorBook>,
    phases: Mutex<HashMap<AddressOnNetwork, DiscoveryPhase>>,
    listeners: Mutex<ChainListeners>,

    /// Fires once the service has started.
    pub initialize_nfts: Signal<()>,
    /// Fires once per completed fetch operation.
    pub update_nfts: Signal<NftUpdate>,
    /// Fires once per failed fetch operation.
    pub fetch_failed: Signal<NftFetchFailure>,
}

impl NftsService {
    /// Construct once the chain service and the store are ready.
    ///
    /// The store is exclusively owned by the service from here on.
    #[instrument(name = "nfts_create", skip_all)]
    pub async fn create<C, S>(
        store: S,
        chain: ServiceHandle<C>,
        fetcher: Arc<dyn NftFetcher>,
    ) -> Result<Arc<Self>, ServiceError>
    where
        C: ChainTracker + 'static,
        S: Future<Output = Result<Arc<dyn NftStore>, ServiceError>> + Send,
    {
        let store = store.await?;
        let chain: Arc<dyn ChainTracker> = chain
            .wait()
            .await
            .map_err(|e| ServiceError::dependency(SERVICE, "chain", &e))?;
        Ok(Self::new(store, chain, fetcher))
    }

    /// Construct from already available collaborators.
    pub fn new(
        store: Arc<dyn NftStore>,
        chain: Arc<dyn ChainTracker>,
        fetcher: Arc<dyn NftFetcher>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            lifecycle: ServiceLifecycle::new(SERVICE),
            store,
            chain,
            fetcher,
            cursors: Mutex::new(CursorBook::new()),
            phases: Mutex::new(HashMap::new()),
            listeners: Mutex::new(ChainListeners {
                started: None,
                new_account: None,
            }),
            initialize_nfts: Signal::new("initializeNFTs"),
            update_nfts: Signal::new("updateNFTs"),
            fetch_failed: Signal::new("fetchFailed"),
        })
    }

    /// Fetch collections for `accounts`, or for every tracked account.
    ///
    /// Resolves after every operation has completed; each completion is
    /// upserted and announced on its own as soon as it arrives.
    #[instrument(skip_all, fields(requested = accounts.as_ref().map(Vec::len)))]
    pub async fn fetch_collections(&self, accounts: Option<Vec<AddressOnNetwork>>) -> FetchSummary {
        let accounts = self.resolve_accounts(accounts).await;
        self.set_phase(&accounts, DiscoveryPhase::CollectionsFetching);

        let operations = self.fetcher.get_collections(&accounts);
        debug!(accounts = accounts.len(), operations = operations.len(), "Fetching collections");

        self.drain(operations, UpdateKind::Collections, DiscoveryPhase::CollectionsFetched, |_, collections| {
            let store = Arc::clone(&self.store);
            async move {
                let upserted = collections.len();
                store.update_collections(collections).await.map(|()| upserted)
            }
        })
        .await
    }

    /// Fetch items of `collections` for `accounts`, or for every tracked
    /// account. Continuation cursors are kept per operation origin, and only
    /// once the page they follow has been stored.
    #[instrument(skip_all, fields(collections = collections.len()))]
    pub async fn fetch_nfts_from_collection(
        &self,
        collections: &[String],
        accounts: Option<Vec<AddressOnNetwork>>,
    ) -> FetchSummary {
        let accounts = self.resolve_accounts(accounts).await;
        self.set_phase(&accounts, DiscoveryPhase::ItemsFetching);

        let operations = self.fetcher.get_items(&accounts, collections);
        debug!(accounts = accounts.len(), operations = operations.len(), "Fetching items");

        self.drain(operations, UpdateKind::Items, DiscoveryPhase::ItemsFetched, |origin, page: ItemsPage| {
            let store = Arc::clone(&self.store);
            async move {
                let upserted = page.items.len();
                store.update_nfts(page.items).await?;
                self.cursors.lock().record(origin, page.next_page_cursors);
                Ok::<_, NftStoreError>(upserted)
            }
        })
        .await
    }

    /// Continuation cursors grouped by the operation that returned them.
    pub fn next_page_cursors(&self) -> BTreeMap<FetchOrigin, Vec<String>> {
        self.cursors.lock().snapshot()
    }

    /// Remove and return the cursors kept for `origin`.
    pub fn take_cursors(&self, origin: &FetchOrigin) -> Vec<String> {
        self.cursors.lock().take(origin)
    }

    pub fn phase(&self, account: &AddressOnNetwork) -> DiscoveryPhase {
        self.phases.lock().get(account).copied().unwrap_or_default()
    }

    async fn resolve_accounts(&self, accounts: Option<Vec<AddressOnNetwork>>) -> Vec<AddressOnNetwork> {
        match accounts {
            Some(accounts) => accounts,
            None => self.chain.accounts_to_track().await,
        }
    }

    fn set_phase(&self, accounts: &[AddressOnNetwork], phase: DiscoveryPhase) {
        let mut phases = self.phases.lock();
        for account in accounts {
            phases.insert(account.clone(), phase);
        }
    }

    /// Run every operation concurrently; handle each completion as it lands.
    async fn drain<T, U, Fut>(
        &self,
        operations: Vec<PendingFetch<T>>,
        kind: UpdateKind,
        done: DiscoveryPhase,
        upsert: impl Fn(FetchOrigin, T) -> Fut,
    ) -> FetchSummary
    where
        Fut: Future<Output = Result<usize, U>>,
        U: std::fmt::Display,
    {
        let mut in_flight: FuturesUnordered<_> = operations
            .into_iter()
            .map(|PendingFetch { origin, result }| {
                let upsert = &upsert;
                async move {
                    let outcome = match result.await {
                        Ok(batch) => upsert(origin.clone(), batch).await.map_err(|e| e.to_string()),
                        Err(e) => Err(e.to_string()),
                    };
                    (origin, outcome)
                }
            })
            .collect();

        let mut summary = FetchSummary::default();
        while let Some((origin, outcome)) = in_flight.next().await {
            match outcome {
                Ok(upserted) => {
                    summary.completed += 1;
                    self.set_phase(std::slice::from_ref(&origin.account), done);
                    debug!(origin = %origin, upserted, "Fetch merged");
                    self.update_nfts.emit(&NftUpdate {
                        account: origin.account,
                        kind,
                        upserted,
                    });
                }
                Err(cause) => {
                    summary.failed += 1;
                    self.set_phase(std::slice::from_ref(&origin.account), DiscoveryPhase::Idle);
                    warn!(origin = %origin, cause = %cause, "NFT fetch failed");
                    self.fetch_failed.emit(&NftFetchFailure {
                        account: origin.account,
                        collection: origin.collection,
                        cause,
                    });
                }
            }
        }
        summary
    }

    fn spawn_fetch(runtime: &Handle, me: &Weak<Self>, accounts: Option<Vec<AddressOnNetwork>>) {
        let Some(service) = me.upgrade() else {
            return;
        };
        runtime.spawn(async move {
            let summary = service.fetch_collections(accounts).await;
            debug!(completed = summary.completed, failed = summary.failed, "Collection fetch finished");
        });
    }

    fn connect_chain_events(&self) -> Result<(), ServiceError> {
        let runtime = Handle::try_current().map_err(|e| ServiceError::startup(SERVICE, e))?;

        let new_account = {
            let runtime = runtime.clone();
            let me = self.me.clone();
            self.chain.new_account_to_track().on(move |account: &AddressOnNetwork| {
                Self::spawn_fetch(&runtime, &me, Some(vec![account.clone()]));
            })
        };

        // Attach first, then look at the state: a start that lands in
        // between is caught by the listener, never by both paths.
        let started = {
            let runtime = runtime.clone();
            let me = self.me.clone();
            self.chain.lifecycle().service_started.once(move |_| {
                Self::spawn_fetch(&runtime, &me, None);
            })
        };
        let mut initial = Some(started);
        if self.chain.lifecycle().is_running() && self.chain.lifecycle().service_started.off(started) {
            info!("Chain already running, starting initial scan");
            Self::spawn_fetch(&runtime, &self.me, None);
            initial = None;
        }

        let mut listeners = self.listeners.lock();
        listeners.started = initial;
        listeners.new_account = Some(new_account);
        Ok(())
    }

    fn disconnect_chain_events(&self) {
        let mut listeners = self.listeners.lock();
        if let Some(id) = listeners.started.take() {
            self.chain.lifecycle().service_started.off(id);
        }
        if let Some(id) = listeners.new_account.take() {
            self.chain.new_account_to_track().off(id);
        }
    }
}

#[async_trait]
impl DomainService for NftsService {
    fn lifecycle(&self) -> &ServiceLifecycle {
        &self.lifecycle
    }

    async fn internal_start(&self) -> Result<(), ServiceError> {
        self.connect_chain_events()?;
        self.initialize_nfts.emit(&());
        Ok(())
    }

    async fn internal_stop(&self) -> Result<(), ServiceError> {
        self.disconnect_chain_events();
        self.store.close().await.map_err(|e| ServiceError::ShutdownFailed {
            service: SERVICE,
            reason: e.to_string(),
        })
    }
}
