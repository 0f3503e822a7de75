//! # Adapters
//!
//! Implementations of the collaborator contracts the runtime depends on.

pub mod persistence;
pub mod prices;

pub use persistence::{
    InMemoryPersistence, JsonFilePersistence, PersistenceError, StatePersistence, StatePersister,
};
pub use prices::{no_prices, static_prices};
