//! # Runtime Configuration
//!
//! Unified configuration for the wallet runtime. Every field has a default;
//! `from_env` applies `WB_*` overrides on top.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `WB_STATE_KEY` | `persistence.state_key` |
//! | `WB_PREFERENCES_KEY` | `persistence.preferences_key` |
//! | `WB_DATA_DIR` | `persistence.data_dir` |
//! | `WB_FILE_STORE` | `persistence.use_file_store` |
//! | `WB_NETWORK` | `network.default_network` |
//! | `WB_CHAIN_ID` | `network.chain_id` |
//! | `WB_RPC_URL` | `network.rpc_url` |
//! | `WB_LOG_LEVEL` | `logging.level` |
//! | `WB_NFT_DISCOVERY` | `services.nft_discovery` |

use std::path::PathBuf;
use std::str::FromStr;

use shared_types::NetworkId;
use tracing::{warn, Level};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub persistence: PersistenceConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
}

/// Where state is persisted.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Key of the versioned state envelope.
    pub state_key: String,
    /// Key of the user preferences record.
    pub preferences_key: String,
    /// Directory used by the file-backed store.
    pub data_dir: PathBuf,
    /// Use the file-backed store instead of the in-memory one.
    pub use_file_store: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_key: "wallet_state".to_string(),
            preferences_key: "wallet_preferences".to_string(),
            data_dir: PathBuf::from("./data"),
            use_file_store: false,
        }
    }
}

/// Selected network at boot.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub default_network: NetworkId,
    pub chain_id: u64,
    /// Opaque to the runtime; handed to the provider.
    pub rpc_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_network: NetworkId::default(),
            chain_id: 1,
            rpc_url: "http://127.0.0.1:8545".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

/// Optional background services.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub nft_discovery: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            nft_discovery: true,
        }
    }
}

impl RuntimeConfig {
    /// Defaults with `WB_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable values are logged and
    /// ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("WB_STATE_KEY") {
            self.persistence.state_key = key;
        }
        if let Some(key) = lookup("WB_PREFERENCES_KEY") {
            self.persistence.preferences_key = key;
        }
        if let Some(dir) = lookup("WB_DATA_DIR") {
            self.persistence.data_dir = PathBuf::from(dir);
        }
        if let Some(flag) = parsed(&lookup, "WB_FILE_STORE", parse_flag) {
            self.persistence.use_file_store = flag;
        }
        if let Some(network) = lookup("WB_NETWORK") {
            self.network.default_network = NetworkId::new(network);
        }
        if let Some(chain_id) = parsed(&lookup, "WB_CHAIN_ID", |v| v.parse().ok()) {
            self.network.chain_id = chain_id;
        }
        if let Some(url) = lookup("WB_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(level) = parsed(&lookup, "WB_LOG_LEVEL", |v| Level::from_str(v).ok()) {
            self.logging.level = level;
        }
        if let Some(flag) = parsed(&lookup, "WB_NFT_DISCOVERY", parse_flag) {
            self.services.nft_discovery = flag;
        }
        self
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let value = parse(raw.trim());
    if value.is_none() {
        warn!(key, value = %raw, "Ignoring unparseable configuration override");
    }
    value
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
