//! # Accounts Subsystem
//!
//! Owns the `accounts` key: the tracked-account set, in insertion order.

use std::sync::Arc;

use shared_bus::{ObservableStore, Signal};
use shared_types::{normalize_address, AccountsState, AddressOnNetwork, TransactionRecord};
use tracing::{debug, info};

use super::networks::NetworkConnection;
use super::transactions::HistoryLookup;
use crate::error::RuntimeError;

pub struct Accounts {
    store: Arc<ObservableStore<AccountsState>>,
    connection: Arc<dyn NetworkConnection>,
    history: HistoryLookup,

    /// Fires with each account newly added to the tracked set.
    pub account_added: Signal<AddressOnNetwork>,
}

impl Accounts {
    pub fn new(
        persisted: AccountsState,
        connection: Arc<dyn NetworkConnection>,
        history: HistoryLookup,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: ObservableStore::shared(persisted),
            connection,
            history,
            account_added: Signal::new("accountAdded"),
        })
    }

    pub fn state(&self) -> AccountsState {
        self.store.get_state()
    }

    pub fn updates(&self) -> &Signal<AccountsState> {
        self.store.updates()
    }

    pub fn tracked(&self) -> Vec<AddressOnNetwork> {
        self.store.get_state().tracked
    }

    /// Track `address` on the selected network.
    ///
    /// Tracking an already tracked account returns it without publishing.
    pub fn add(&self, address: &str) -> Result<AddressOnNetwork, RuntimeError> {
        let address = validate_address(address)?;
        let account = AddressOnNetwork::new(address, self.connection.network().id.clone());

        let added = self.store.update_with(|state: &AccountsState| {
            if state.tracked.contains(&account) {
                return None;
            }
            let mut next = state.clone();
            next.tracked.push(account.clone());
            Some(next)
        });
        if !added {
            debug!(account = %account, "Account already tracked");
            return Ok(account);
        }

        info!(account = %account, "Tracking account");
        self.account_added.emit(&account);
        Ok(account)
    }

    /// Transactions involving `address`, via the bound history lookup.
    pub async fn history(&self, address: &str) -> Vec<TransactionRecord> {
        (self.history)(address).await
    }
}

/// Normalize `address` and check it is 20 bytes of hex.
pub fn validate_address(address: &str) -> Result<String, RuntimeError> {
    let normalized = normalize_address(address);
    match hex::decode(&normalized[2..]) {
        Ok(bytes) if bytes.len() == 20 => Ok(normalized),
        _ => Err(RuntimeError::InvalidAddress(address.to_string())),
    }
}
