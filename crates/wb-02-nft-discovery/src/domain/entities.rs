//! Discovery notifications and bookkeeping values

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{AddressOnNetwork, NftRecord};

/// Which granularity an operation fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Collections,
    Items,
}

/// Payload of `update_nfts`: one per completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftUpdate {
    pub account: AddressOnNetwork,
    pub kind: UpdateKind,
    /// Number of records upserted by this operation.
    pub upserted: usize,
}

/// Payload of `fetch_failed`: one per failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftFetchFailure {
    pub account: AddressOnNetwork,
    /// Set when the operation targeted a single collection.
    pub collection: Option<String>,
    pub cause: String,
}

/// Where a fetch operation (and its continuation cursors) came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchOrigin {
    pub account: AddressOnNetwork,
    pub collection: Option<String>,
}

impl fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(collection) => write!(f, "{}/{}", self.account, collection),
            None => write!(f, "{}", self.account),
        }
    }
}

/// One page of items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsPage {
    pub items: Vec<NftRecord>,
    pub next_page_cursors: Vec<String>,
}

/// Per-account progress through a discovery cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryPhase {
    #[default]
    Idle,
    CollectionsFetching,
    CollectionsFetched,
    ItemsFetching,
    ItemsFetched,
}

/// Outcome counts of one fetch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub completed: usize,
    pub failed: usize,
}

impl FetchSummary {
    pub fn operations(&self) -> usize {
        self.completed + self.failed
    }
}
