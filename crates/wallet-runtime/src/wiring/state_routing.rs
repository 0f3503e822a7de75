//! # State Routing
//!
//! Listener wiring between subsystems, the aggregate store, persistence and
//! external subscribers.
//!
//! ```text
//! networks ──update──┐
//! transactions ──────┼──→ ObservableStore<MainState> ──update──┬──→ StatePersister
//! accounts ──────────┤                                         └──→ broker "/state/"
//! indexing ──tokens──┘
//!
//! accounts ──accountAdded──→ chain.add_account_to_track
//! nfts ──updateNFTs / fetchFailed──→ broker "/nfts/" {address, network}
//! ```
//!
//! Every route replaces exactly the key its source owns.

use std::sync::Arc;

use serde_json::{json, Value};
use shared_bus::{ListenerId, ObservableStore, SubscriptionBroker};
use shared_types::{
    AccountsState, AddressOnNetwork, FungibleAsset, MainState, NetworksState, StatePatch,
    TransactionsState,
};
use tracing::{debug, warn};
use wb_01_state_migration::{StateEnvelope, CURRENT_VERSION};
use wb_02_nft_discovery::{NftFetchFailure, NftUpdate, NftsService};

use crate::adapters::StatePersister;
use crate::api::{NftEvent, NFTS_ROUTE, STATE_ROUTE};
use crate::subsystems::{Accounts, ChainService, IndexingService, Networks, Transactions};

/// Route each synchronous subsystem's updates into its own top-level key.
pub fn route_subsystem_updates(
    state: &Arc<ObservableStore<MainState>>,
    networks: &Networks,
    transactions: &Transactions,
    accounts: &Accounts,
) -> Vec<ListenerId> {
    let store = Arc::clone(state);
    let networks_id = networks
        .updates()
        .on(move |s: &NetworksState| store.update_state(StatePatch::networks(s.clone())));

    let store = Arc::clone(state);
    let transactions_id = transactions.updates().on(move |s: &TransactionsState| {
        store.update_state(StatePatch::transactions(s.clone()))
    });

    let store = Arc::clone(state);
    let accounts_id = accounts
        .updates()
        .on(move |s: &AccountsState| store.update_state(StatePatch::accounts(s.clone())));

    vec![networks_id, transactions_id, accounts_id]
}

/// Persist the current-version envelope and notify `"/state/"` subscribers
/// after every store update.
pub fn route_state_out(
    state: &ObservableStore<MainState>,
    broker: Arc<SubscriptionBroker>,
    persister: Arc<StatePersister>,
) -> ListenerId {
    state.on(move |snapshot: &MainState| {
        let value = match serde_json::to_value(snapshot) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "State snapshot not serializable; skipping");
                return;
            }
        };
        persister.persist(StateEnvelope::new(CURRENT_VERSION, value.clone()).to_value());

        let report = broker.publish(STATE_ROUTE, &json!({}), &value);
        if !report.failures.is_empty() {
            debug!(failed = report.failures.len(), "State subscribers failed");
        }
    })
}

/// Forward newly tracked accounts to the chain service.
pub fn route_accounts_to_chain(accounts: &Accounts, chain: Arc<ChainService>) -> ListenerId {
    accounts.account_added.on(move |account: &AddressOnNetwork| {
        chain.add_account_to_track(account.clone());
    })
}

/// Route the indexing service's tracked list into `tokens_to_track`.
pub fn route_tokens_to_state(
    indexing: &IndexingService,
    state: Arc<ObservableStore<MainState>>,
) -> ListenerId {
    indexing.tokens_updated.on(move |tokens: &Vec<FungibleAsset>| {
        state.update_state(StatePatch::tokens_to_track(tokens.clone()))
    })
}

/// Publish discovery notifications on `"/nfts/"`, keyed by the account.
pub fn route_nft_events(nfts: &NftsService, broker: Arc<SubscriptionBroker>) -> [ListenerId; 2] {
    let updates = {
        let broker = Arc::clone(&broker);
        nfts.update_nfts.on(move |update: &NftUpdate| {
            publish_nft_event(&broker, &update.account, NftEvent::Updated(update.clone()));
        })
    };
    let failures = nfts.fetch_failed.on(move |failure: &NftFetchFailure| {
        publish_nft_event(&broker, &failure.account, NftEvent::Failed(failure.clone()));
    });
    [updates, failures]
}

/// Parameters of the `"/nfts/"` route for `account`.
pub fn nft_route_params(account: &AddressOnNetwork) -> Value {
    json!({ "address": account.address, "network": account.network })
}

fn publish_nft_event(broker: &SubscriptionBroker, account: &AddressOnNetwork, event: NftEvent) {
    match serde_json::to_value(&event) {
        Ok(payload) => {
            broker.publish(NFTS_ROUTE, &nft_route_params(account), &payload);
        }
        Err(e) => warn!(%account, error = %e, "NFT event not serializable"),
    }
}
