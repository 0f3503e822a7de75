//! Outbound Ports (Driven Ports)
//!
//! Dependencies the discovery pipeline needs from the rest of the wallet:
//! the chain service that owns the tracked-account set, a remote fetch
//! service and durable storage.

use async_trait::async_trait;
use futures::future::BoxFuture;
use shared_bus::{DomainService, Signal};
use shared_types::{AddressOnNetwork, CollectionRecord, NftRecord};

use crate::domain::{FetchError, FetchOrigin, ItemsPage, NftStoreError};

/// Upstream chain service.
///
/// Its lifecycle's `service_started` triggers the initial full scan.
#[async_trait]
pub trait ChainTracker: DomainService {
    /// Fires with each account added to the tracked set.
    fn new_account_to_track(&self) -> &Signal<AddressOnNetwork>;

    /// The full tracked-account set.
    async fn accounts_to_track(&self) -> Vec<AddressOnNetwork>;
}

/// One in-flight remote operation.
pub struct PendingFetch<T> {
    pub origin: FetchOrigin,
    pub result: BoxFuture<'static, Result<T, FetchError>>,
}

impl<T> PendingFetch<T> {
    pub fn new(origin: FetchOrigin, result: BoxFuture<'static, Result<T, FetchError>>) -> Self {
        Self { origin, result }
    }
}

/// Remote NFT lookups.
///
/// Both calls return immediately with one pending result per operation; how
/// accounts and collections are split into operations is up to the adapter.
pub trait NftFetcher: Send + Sync {
    fn get_collections(
        &self,
        accounts: &[AddressOnNetwork],
    ) -> Vec<PendingFetch<Vec<CollectionRecord>>>;

    fn get_items(
        &self,
        accounts: &[AddressOnNetwork],
        collections: &[String],
    ) -> Vec<PendingFetch<ItemsPage>>;
}

/// Durable upsert storage, exclusively owned by the pipeline.
#[async_trait]
pub trait NftStore: Send + Sync {
    /// Insert or replace by [`CollectionRecord::key`].
    async fn update_collections(&self, batch: Vec<CollectionRecord>) -> Result<(), NftStoreError>;

    /// Insert or replace by [`NftRecord::key`].
    async fn update_nfts(&self, batch: Vec<NftRecord>) -> Result<(), NftStoreError>;

    async fn close(&self) -> Result<(), NftStoreError>;
}
