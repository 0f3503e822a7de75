//! Price lookups handed to the transaction subsystem.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;

use crate::subsystems::transactions::PriceLookup;

/// Lookup that never has a quote.
pub fn no_prices() -> PriceLookup {
    Arc::new(|_asset: &str| async { None::<f64> }.boxed())
}

/// Lookup answering from a fixed table, keyed case-insensitively.
pub fn static_prices<I, K>(quotes: I) -> PriceLookup
where
    I: IntoIterator<Item = (K, f64)>,
    K: AsRef<str>,
{
    let table: Arc<HashMap<String, f64>> = Arc::new(
        quotes
            .into_iter()
            .map(|(asset, price)| (asset.as_ref().to_ascii_lowercase(), price))
            .collect(),
    );
    Arc::new(move |asset: &str| {
        let quote = table.get(&asset.to_ascii_lowercase()).copied();
        async move { quote }.boxed()
    })
}
