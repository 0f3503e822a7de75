//! # Chain Service
//!
//! Background service holding the set of accounts whose on-chain activity is
//! followed. Asset discovery waits on it and reacts to its signals.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{DomainService, ServiceLifecycle, Signal};
use shared_types::{AddressOnNetwork, ServiceError};
use tracing::{debug, info, instrument};
use wb_02_nft_discovery::ChainTracker;

use super::networks::NetworkConnection;

const SERVICE: &str = "chain";

pub struct ChainService {
    lifecycle: ServiceLifecycle,
    connection: Arc<dyn NetworkConnection>,
    tracked: RwLock<Vec<AddressOnNetwork>>,

    /// Fires with each account added to the tracked set.
    pub new_account_to_track: Signal<AddressOnNetwork>,
}

impl ChainService {
    #[instrument(name = "chain_create", skip_all, fields(accounts = initial.len()))]
    pub async fn create(
        initial: Vec<AddressOnNetwork>,
        connection: Arc<dyn NetworkConnection>,
    ) -> Result<Arc<Self>, ServiceError> {
        Ok(Arc::new(Self {
            lifecycle: ServiceLifecycle::new(SERVICE),
            connection,
            tracked: RwLock::new(initial),
            new_account_to_track: Signal::new("newAccountToTrack"),
        }))
    }

    /// Start following `account`. Already followed accounts are ignored.
    pub fn add_account_to_track(&self, account: AddressOnNetwork) -> bool {
        {
            let mut tracked = self.tracked.write();
            if tracked.contains(&account) {
                debug!(%account, "Account already followed");
                return false;
            }
            tracked.push(account.clone());
        }
        info!(%account, "Following account");
        self.new_account_to_track.emit(&account);
        true
    }

    pub fn tracked(&self) -> Vec<AddressOnNetwork> {
        self.tracked.read().clone()
    }
}

#[async_trait]
impl DomainService for ChainService {
    fn lifecycle(&self) -> &ServiceLifecycle {
        &self.lifecycle
    }

    async fn internal_start(&self) -> Result<(), ServiceError> {
        debug!(
            network = %self.connection.network().id,
            connected = self.connection.is_open(),
            accounts = self.tracked.read().len(),
            "Chain service starting"
        );
        Ok(())
    }
}

#[async_trait]
impl ChainTracker for ChainService {
    fn new_account_to_track(&self) -> &Signal<AddressOnNetwork> {
        &self.new_account_to_track
    }

    async fn accounts_to_track(&self) -> Vec<AddressOnNetwork> {
        self.tracked()
    }
}
