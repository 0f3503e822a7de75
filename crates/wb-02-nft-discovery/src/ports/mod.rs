//! Ports Layer - driven ports

pub mod outbound;

pub use outbound::{ChainTracker, NftFetcher, NftStore, PendingFetch};
