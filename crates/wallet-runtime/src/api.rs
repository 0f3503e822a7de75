//! # External Surface
//!
//! Request and notification shapes exchanged with external consumers, plus
//! the route table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wb_02_nft_discovery::{NftFetchFailure, NftUpdate};

use crate::subsystems::keys::{KeyImport, KeyKind};

/// Aggregate state snapshots, published after every store update.
pub const STATE_ROUTE: &str = "/state/";

/// Asset discovery notifications, keyed by `{address, network}`.
pub const NFTS_ROUTE: &str = "/nfts/";

pub const ACCOUNTS_ROUTE: &str = "/accounts/";

/// Request handled by [`Main::import`](crate::Main::import).
///
/// Dispatched by intent: key material wins over an address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub address: Option<String>,
    /// Raw key material.
    #[serde(default)]
    pub data: Option<String>,
    /// Kind of `data`. Guessed from its shape when absent.
    #[serde(default)]
    pub kind: Option<KeyKind>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ImportRequest {
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    pub fn key(kind: KeyKind, data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// The key import carried by this request, if any material is present.
    pub fn key_material(&self) -> Option<KeyImport> {
        let data = self.data.as_deref().filter(|d| !d.trim().is_empty())?;
        let kind = self.kind.unwrap_or_else(|| {
            if data.split_whitespace().nth(1).is_some() {
                KeyKind::Mnemonic
            } else {
                KeyKind::PrivateKey
            }
        });
        Some(KeyImport {
            kind,
            data: data.to_string(),
            name: self.name.clone(),
        })
    }
}

/// Payload published on [`NFTS_ROUTE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NftEvent {
    Updated(NftUpdate),
    Failed(NftFetchFailure),
}

/// Route → supported operations.
pub type ApiDescriptor = BTreeMap<&'static str, Vec<&'static str>>;

pub(crate) fn api_descriptor() -> ApiDescriptor {
    BTreeMap::from([
        (ACCOUNTS_ROUTE, vec!["add", "import", "history"]),
        (NFTS_ROUTE, vec!["subscribe", "unsubscribe"]),
        (STATE_ROUTE, vec!["get", "subscribe", "unsubscribe"]),
    ])
}
