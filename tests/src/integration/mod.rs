//! Integration flows.

pub mod boot_flows;
pub mod discovery_flows;
pub mod subscription_flows;

use std::sync::Arc;

use wallet_runtime::adapters::InMemoryPersistence;
use wallet_runtime::{Collaborators, RuntimeConfig};
use wb_02_nft_discovery::{InMemoryNftFetcher, InMemoryNftStore};

pub const ALICE: &str = "0x00000000000000000000000000000000000000a1";
pub const BOB: &str = "0x00000000000000000000000000000000000000b2";

/// In-memory collaborators with every handle kept for inspection.
pub struct Harness {
    pub config: RuntimeConfig,
    pub persistence: Arc<InMemoryPersistence>,
    pub fetcher: Arc<InMemoryNftFetcher>,
    pub store: Arc<InMemoryNftStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_persistence(InMemoryPersistence::new())
    }

    pub fn with_persistence(persistence: InMemoryPersistence) -> Self {
        Self {
            config: RuntimeConfig::default(),
            persistence: Arc::new(persistence),
            fetcher: Arc::new(InMemoryNftFetcher::new()),
            store: Arc::new(InMemoryNftStore::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        let mut collaborators = Collaborators::in_memory(&self.config);
        collaborators.persistence = self.persistence.clone();
        collaborators.nft_fetcher = self.fetcher.clone();
        collaborators.nft_store = self.store.clone();
        collaborators
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
