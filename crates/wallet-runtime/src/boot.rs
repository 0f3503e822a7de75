//! # Boot Sequence
//!
//! ```text
//! read envelope ──→ migrate ──→ decode ──→ persist migrated envelope ──→ Main::new
//!        │              │           │
//!        └──────────────┴───────────┴──→ BootError (nothing written, nothing built)
//! ```

use std::sync::Arc;

use shared_types::NetworkDescriptor;
use tracing::{info, instrument};
use wb_01_state_migration::{decode_state, wallet_migrations};
use wb_02_nft_discovery::{InMemoryNftFetcher, InMemoryNftStore, NftFetcher, NftStore};

use crate::adapters::{no_prices, InMemoryPersistence, JsonFilePersistence, StatePersistence};
use crate::container::{Main, RuntimeConfig};
use crate::error::BootError;
use crate::subsystems::{NetworkConnection, PriceLookup, Provider};

/// External collaborators the runtime is built on.
pub struct Collaborators {
    pub persistence: Arc<dyn StatePersistence>,
    /// Connection for the selected network.
    pub connection: Arc<dyn NetworkConnection>,
    pub price_lookup: PriceLookup,
    pub nft_fetcher: Arc<dyn NftFetcher>,
    /// Handed to asset discovery, which owns it from then on.
    pub nft_store: Arc<dyn NftStore>,
}

impl Collaborators {
    /// Everything in memory.
    pub fn in_memory(config: &RuntimeConfig) -> Self {
        Self {
            persistence: Arc::new(InMemoryPersistence::new()),
            connection: provider(config),
            price_lookup: no_prices(),
            nft_fetcher: Arc::new(InMemoryNftFetcher::new()),
            nft_store: Arc::new(InMemoryNftStore::new()),
        }
    }

    /// As configured: the file-backed store when enabled, otherwise memory.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut collaborators = Self::in_memory(config);
        if config.persistence.use_file_store {
            collaborators.persistence =
                Arc::new(JsonFilePersistence::new(config.persistence.data_dir.clone()));
        }
        collaborators
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn StatePersistence>) -> Self {
        self.persistence = persistence;
        self
    }
}

fn provider(config: &RuntimeConfig) -> Arc<dyn NetworkConnection> {
    let id = config.network.default_network.clone();
    Arc::new(Provider::new(
        NetworkDescriptor {
            name: id.as_str().to_string(),
            id,
            chain_id: config.network.chain_id,
        },
        config.network.rpc_url.clone(),
    ))
}

/// Read, migrate and persist the state envelope, then build [`Main`].
///
/// A migration failure aborts before anything is written.
#[instrument(skip_all, fields(key = %config.persistence.state_key))]
pub async fn start_api(
    config: RuntimeConfig,
    collaborators: Collaborators,
) -> Result<Main, BootError> {
    let key = config.persistence.state_key.clone();
    let persistence = Arc::clone(&collaborators.persistence);

    let raw = persistence.read(&key).await?;
    let envelope = wallet_migrations()?.migrate(raw.as_ref())?;
    let state = decode_state(&envelope)?;

    persistence.write(&key, &envelope.to_value()).await?;
    info!(version = envelope.version, "Persisted state migrated");

    Ok(Main::new(state, config, collaborators))
}
