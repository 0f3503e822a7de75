//! # Transactions Subsystem
//!
//! Owns the `transactions` key. Each recorded transaction is annotated with
//! a fiat quote for the network's native asset before the sub-state is
//! republished.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use shared_bus::{ObservableStore, Signal};
use shared_types::{normalize_address, TransactionRecord, TransactionsState};
use tracing::debug;

use super::networks::NetworkConnection;

/// Asset id → fiat quote, if one is available.
pub type PriceLookup = Arc<dyn Fn(&str) -> BoxFuture<'static, Option<f64>> + Send + Sync>;

/// Address → transactions involving it, handed to the account subsystem.
pub type HistoryLookup =
    Arc<dyn Fn(&str) -> BoxFuture<'static, Vec<TransactionRecord>> + Send + Sync>;

pub struct Transactions {
    store: Arc<ObservableStore<TransactionsState>>,
    connection: Arc<dyn NetworkConnection>,
    price: PriceLookup,
}

impl Transactions {
    pub fn new(
        initial: TransactionsState,
        connection: Arc<dyn NetworkConnection>,
        price: PriceLookup,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: ObservableStore::shared(initial),
            connection,
            price,
        })
    }

    pub fn state(&self) -> TransactionsState {
        self.store.get_state()
    }

    pub fn updates(&self) -> &Signal<TransactionsState> {
        self.store.updates()
    }

    /// Record (or replace, by hash) a transaction.
    ///
    /// An existing fiat quote is kept; otherwise the price lookup is asked
    /// for one.
    pub async fn record(&self, mut tx: TransactionRecord) -> TransactionRecord {
        tx.hash = tx.hash.to_ascii_lowercase();
        if tx.fiat_price.is_none() {
            tx.fiat_price = (self.price)(tx.network.as_str()).await;
        }

        self.store.update_with(|state: &TransactionsState| {
            let mut next = state.clone();
            match next.records.iter_mut().find(|r| r.hash == tx.hash) {
                Some(existing) => *existing = tx.clone(),
                None => next.records.push(tx.clone()),
            }
            Some(next)
        });
        debug!(
            hash = %tx.hash,
            network = %tx.network,
            connected = self.connection.is_open(),
            priced = tx.fiat_price.is_some(),
            "Transaction recorded"
        );
        tx
    }

    /// Transactions sent or received by `address`, in record order.
    pub fn get_history(&self, address: &str) -> Vec<TransactionRecord> {
        let address = normalize_address(address);
        self.store
            .get_state()
            .records
            .into_iter()
            .filter(|tx| tx.involves(&address))
            .collect()
    }

    /// `get_history` as a bound function, so holders need no reference to
    /// the subsystem itself.
    pub fn history_lookup(self: &Arc<Self>) -> HistoryLookup {
        let transactions = Arc::downgrade(self);
        Arc::new(move |address: &str| {
            let history = transactions
                .upgrade()
                .map(|t| t.get_history(address))
                .unwrap_or_default();
            async move { history }.boxed()
        })
    }
}
