//! Domain subsystems composed by the orchestrator.
//!
//! Synchronous subsystems (built in this order):
//! networks → transactions → accounts → keys.
//!
//! Background services (started asynchronously, exposed as handles):
//! preferences → indexing, chain → asset discovery.

pub mod accounts;
pub mod chain;
pub mod indexing;
pub mod keys;
pub mod networks;
pub mod preferences;
pub mod transactions;

pub use accounts::Accounts;
pub use chain::ChainService;
pub use indexing::IndexingService;
pub use keys::{KeyError, KeyImport, KeyKind, Keys};
pub use networks::{ConnectionError, NetworkConnection, Networks, Provider};
pub use preferences::{PreferenceService, Preferences};
pub use transactions::{HistoryLookup, PriceLookup, Transactions};
