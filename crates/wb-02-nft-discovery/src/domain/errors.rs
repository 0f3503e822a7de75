//! Error types for NFT discovery

use thiserror::Error;

/// A remote fetch operation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("rate limited")]
    RateLimited,
}

/// Durable storage rejected an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NftStoreError {
    #[error("store is closed")]
    Closed,

    #[error("storage backend error: {0}")]
    Backend(String),
}
