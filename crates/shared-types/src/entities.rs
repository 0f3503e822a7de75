//! # Core Domain Entities
//!
//! Defines the aggregate wallet state record and the entities every
//! subsystem shares.
//!
//! ## Clusters
//!
//! - **Aggregate**: `MainState`, `StatePatch`
//! - **Accounts & Networks**: `AddressOnNetwork`, `NetworkId`, `AccountsState`, `NetworksState`
//! - **Transactions**: `TransactionRecord`, `TransactionsState`
//! - **Assets**: `FungibleAsset`, `CollectionRecord`, `NftRecord`

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: ACCOUNTS & NETWORKS
// =============================================================================

/// Identifier of a ledger network (e.g. `"ethereum"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::new("ethereum")
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked account: an address paired with the network it lives on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressOnNetwork {
    /// Hex-encoded address, lowercase with `0x` prefix.
    pub address: String,
    /// Network the address is monitored on.
    pub network: NetworkId,
}

impl AddressOnNetwork {
    pub fn new(address: impl Into<String>, network: NetworkId) -> Self {
        Self {
            address: normalize_address(&address.into()),
            network,
        }
    }
}

impl fmt::Display for AddressOnNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.address, self.network)
    }
}

/// Lowercase an address and make sure it carries the `0x` prefix.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", body.to_ascii_lowercase())
}

/// Sub-state owned by the account subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountsState {
    /// Accounts in the order they were added.
    pub tracked: Vec<AddressOnNetwork>,
}

/// Static description of a network the wallet can connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub id: NetworkId,
    pub name: String,
    pub chain_id: u64,
}

/// Connection status of the selected provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

/// Sub-state owned by the network subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworksState {
    pub selected: NetworkId,
    pub known: Vec<NetworkDescriptor>,
    #[serde(default)]
    pub status: ConnectionStatus,
}

impl Default for NetworksState {
    fn default() -> Self {
        Self {
            selected: NetworkId::default(),
            known: vec![NetworkDescriptor {
                id: NetworkId::default(),
                name: "Ethereum".to_string(),
                chain_id: 1,
            }],
            status: ConnectionStatus::Disconnected,
        }
    }
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// A transaction known to the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub network: NetworkId,
    /// Value in the network's base unit, decimal string.
    pub value: String,
    /// Fiat quote of the native asset at record time, when one was available.
    #[serde(default)]
    pub fiat_price: Option<f64>,
}

impl TransactionRecord {
    /// Whether `address` is the sender or recipient.
    pub fn involves(&self, address: &str) -> bool {
        let address = normalize_address(address);
        normalize_address(&self.from) == address
            || self
                .to
                .as_deref()
                .map(|to| normalize_address(to) == address)
                .unwrap_or(false)
    }
}

/// Sub-state owned by the transaction subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionsState {
    pub records: Vec<TransactionRecord>,
}

// =============================================================================
// CLUSTER C: ASSETS
// =============================================================================

/// A smart-contract fungible asset whose balances are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FungibleAsset {
    pub symbol: String,
    pub contract_address: String,
    pub network: NetworkId,
    pub decimals: u8,
}

/// An NFT collection owned (at least partly) by a tracked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    pub name: String,
    pub owner: AddressOnNetwork,
    #[serde(default)]
    pub item_count: Option<u64>,
}

impl CollectionRecord {
    /// Upsert key: the same collection is stored once per owner.
    pub fn key(&self) -> (AddressOnNetwork, String) {
        (self.owner.clone(), self.id.clone())
    }
}

/// A single NFT item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftRecord {
    pub token_id: String,
    pub collection_id: String,
    pub owner: AddressOnNetwork,
    pub name: Option<String>,
    pub media_url: Option<String>,
}

impl NftRecord {
    /// Upsert key.
    pub fn key(&self) -> (AddressOnNetwork, String, String) {
        (
            self.owner.clone(),
            self.collection_id.clone(),
            self.token_id.clone(),
        )
    }
}

// =============================================================================
// CLUSTER D: AGGREGATE STATE
// =============================================================================

/// The aggregate application state record.
///
/// Each top-level key is owned by exactly one subsystem and is only ever
/// replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainState {
    pub accounts: AccountsState,
    pub transactions: TransactionsState,
    pub networks: NetworksState,
    pub tokens_to_track: Vec<FungibleAsset>,
}

/// A partial update of [`MainState`]: every present key replaces the
/// current value wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub accounts: Option<AccountsState>,
    pub transactions: Option<TransactionsState>,
    pub networks: Option<NetworksState>,
    pub tokens_to_track: Option<Vec<FungibleAsset>>,
}

impl StatePatch {
    pub fn accounts(state: AccountsState) -> Self {
        Self {
            accounts: Some(state),
            ..Self::default()
        }
    }

    pub fn transactions(state: TransactionsState) -> Self {
        Self {
            transactions: Some(state),
            ..Self::default()
        }
    }

    pub fn networks(state: NetworksState) -> Self {
        Self {
            networks: Some(state),
            ..Self::default()
        }
    }

    pub fn tokens_to_track(tokens: Vec<FungibleAsset>) -> Self {
        Self {
            tokens_to_track: Some(tokens),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_none()
            && self.transactions.is_none()
            && self.networks.is_none()
            && self.tokens_to_track.is_none()
    }

    /// Names of the keys this patch touches, for logging.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.accounts.is_some() {
            keys.push("accounts");
        }
        if self.transactions.is_some() {
            keys.push("transactions");
        }
        if self.networks.is_some() {
            keys.push("networks");
        }
        if self.tokens_to_track.is_some() {
            keys.push("tokens_to_track");
        }
        keys
    }
}

impl MainState {
    /// Replace every key present in `patch`; absent keys are left untouched.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(accounts) = patch.accounts {
            self.accounts = accounts;
        }
        if let Some(transactions) = patch.transactions {
            self.transactions = transactions;
        }
        if let Some(networks) = patch.networks {
            self.networks = networks;
        }
        if let Some(tokens) = patch.tokens_to_track {
            self.tokens_to_track = tokens;
        }
    }
}
