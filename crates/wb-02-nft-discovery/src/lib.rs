//! # WB-02 NFT Discovery
//!
//! Asset-discovery pipeline: finds the NFT collections and items owned by
//! tracked accounts, upserts them into durable storage and notifies
//! listeners as each fetch completes.
//!
//! ## Architecture
//!
//! Hexagonal layout:
//!
//! - **Domain Layer** (`domain/`): notifications, failures, fetch origins,
//!   the per-origin cursor book. No I/O.
//! - **Ports Layer** (`ports/`): driven ports
//!   - `ChainTracker`: upstream chain service (lifecycle + tracked accounts)
//!   - `NftFetcher`: remote lookups returning one pending result per operation
//!   - `NftStore`: durable upsert storage
//! - **Service Layer** (`service`): `NftsService`, a `DomainService`
//! - **Adapters Layer** (`adapters/`): in-memory store and scripted fetcher
//!
//! ## Triggers
//!
//! ```text
//! chain.service_started (once) ──→ fetch_collections(all tracked)
//! chain.new_account_to_track ────→ fetch_collections([new account])
//! ```
//!
//! ## Fan-out
//!
//! Every fetch call issues its operations concurrently. Each completion is
//! handled on its own: upsert, then one `update_nfts` notification. A failed
//! operation emits `fetch_failed` and never affects its siblings.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryNftFetcher, InMemoryNftStore};
pub use domain::{
    CursorBook, DiscoveryPhase, FetchError, FetchOrigin, FetchSummary, ItemsPage, NftFetchFailure,
    NftStoreError, NftUpdate, UpdateKind,
};
pub use ports::{ChainTracker, NftFetcher, NftStore, PendingFetch};
pub use service::NftsService;
