//! In-memory adapters for the discovery ports.
//!
//! `InMemoryNftStore` is a real upsert store. `InMemoryNftFetcher` serves
//! scripted responses, optionally delayed, and records every request.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use shared_types::{AddressOnNetwork, CollectionRecord, NftRecord};

use crate::domain::{FetchError, FetchOrigin, ItemsPage, NftStoreError};
use crate::ports::{NftFetcher, NftStore, PendingFetch};

type CollectionKey = (AddressOnNetwork, String);
type NftKey = (AddressOnNetwork, String, String);

/// Upsert store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryNftStore {
    collections: RwLock<BTreeMap<CollectionKey, CollectionRecord>>,
    nfts: RwLock<BTreeMap<NftKey, NftRecord>>,
    closed: AtomicBool,
}

impl InMemoryNftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> Vec<CollectionRecord> {
        self.collections.read().values().cloned().collect()
    }

    pub fn collections_of(&self, owner: &AddressOnNetwork) -> Vec<CollectionRecord> {
        self.collections
            .read()
            .values()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect()
    }

    pub fn nfts(&self) -> Vec<NftRecord> {
        self.nfts.read().values().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), NftStoreError> {
        if self.is_closed() {
            return Err(NftStoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl NftStore for InMemoryNftStore {
    async fn update_collections(&self, batch: Vec<CollectionRecord>) -> Result<(), NftStoreError> {
        self.ensure_open()?;
        let mut collections = self.collections.write();
        for record in batch {
            collections.insert(record.key(), record);
        }
        Ok(())
    }

    async fn update_nfts(&self, batch: Vec<NftRecord>) -> Result<(), NftStoreError> {
        self.ensure_open()?;
        let mut nfts = self.nfts.write();
        for record in batch {
            nfts.insert(record.key(), record);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), NftStoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
struct Scripted<T> {
    response: Result<T, FetchError>,
    delay: Option<Duration>,
}

/// Fetcher answering from scripted responses.
///
/// Collections are fetched with one operation per account, items with one
/// operation per (account, collection). Unscripted lookups succeed empty.
#[derive(Default)]
pub struct InMemoryNftFetcher {
    collections: RwLock<HashMap<AddressOnNetwork, Scripted<Vec<CollectionRecord>>>>,
    items: RwLock<HashMap<(AddressOnNetwork, String), Scripted<ItemsPage>>>,
    collection_requests: Mutex<Vec<Vec<AddressOnNetwork>>>,
    item_requests: Mutex<Vec<(Vec<AddressOnNetwork>, Vec<String>)>>,
}

impl InMemoryNftFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_collections(
        &self,
        account: AddressOnNetwork,
        response: Result<Vec<CollectionRecord>, FetchError>,
    ) {
        self.set_collections_delayed(account, response, None);
    }

    /// Script a collections response that resolves after `delay`.
    pub fn set_collections_delayed(
        &self,
        account: AddressOnNetwork,
        response: Result<Vec<CollectionRecord>, FetchError>,
        delay: Option<Duration>,
    ) {
        self.collections
            .write()
            .insert(account, Scripted { response, delay });
    }

    pub fn set_items(
        &self,
        account: AddressOnNetwork,
        collection: impl Into<String>,
        response: Result<ItemsPage, FetchError>,
    ) {
        self.items.write().insert(
            (account, collection.into()),
            Scripted {
                response,
                delay: None,
            },
        );
    }

    /// Account lists passed to `get_collections`, in call order.
    pub fn collection_requests(&self) -> Vec<Vec<AddressOnNetwork>> {
        self.collection_requests.lock().clone()
    }

    /// Arguments passed to `get_items`, in call order.
    pub fn item_requests(&self) -> Vec<(Vec<AddressOnNetwork>, Vec<String>)> {
        self.item_requests.lock().clone()
    }
}

fn pending<T: Send + 'static>(origin: FetchOrigin, scripted: Scripted<T>) -> PendingFetch<T> {
    let Scripted { response, delay } = scripted;
    PendingFetch::new(
        origin,
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        }
        .boxed(),
    )
}

impl NftFetcher for InMemoryNftFetcher {
    fn get_collections(
        &self,
        accounts: &[AddressOnNetwork],
    ) -> Vec<PendingFetch<Vec<CollectionRecord>>> {
        self.collection_requests.lock().push(accounts.to_vec());
        let scripts = self.collections.read();
        accounts
            .iter()
            .map(|account| {
                let scripted = scripts.get(account).cloned().unwrap_or(Scripted {
                    response: Ok(Vec::new()),
                    delay: None,
                });
                let origin = FetchOrigin {
                    account: account.clone(),
                    collection: None,
                };
                pending(origin, scripted)
            })
            .collect()
    }

    fn get_items(
        &self,
        accounts: &[AddressOnNetwork],
        collections: &[String],
    ) -> Vec<PendingFetch<ItemsPage>> {
        self.item_requests
            .lock()
            .push((accounts.to_vec(), collections.to_vec()));
        let scripts = self.items.read();
        accounts
            .iter()
            .flat_map(|account| collections.iter().map(move |c| (account, c)))
            .map(|(account, collection)| {
                let scripted = scripts
                    .get(&(account.clone(), collection.clone()))
                    .cloned()
                    .unwrap_or(Scripted {
                        response: Ok(ItemsPage::default()),
                        delay: None,
                    });
                let origin = FetchOrigin {
                    account: account.clone(),
                    collection: Some(collection.clone()),
                };
                pending(origin, scripted)
            })
            .collect()
    }
}
