//! Domain Layer - discovery values and bookkeeping
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod cursors;
pub mod entities;
pub mod errors;

pub use cursors::CursorBook;
pub use entities::{
    DiscoveryPhase, FetchOrigin, FetchSummary, ItemsPage, NftFetchFailure, NftUpdate, UpdateKind,
};
pub use errors::{FetchError, NftStoreError};
