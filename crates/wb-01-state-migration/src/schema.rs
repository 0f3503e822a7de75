//! Wallet schema chain
//!
//! | Version | Change |
//! |---------|--------|
//! | 1 | seed: `accounts.addresses` is a list of bare addresses |
//! | 2 | adds `tokens_to_track` |
//! | 3 | `accounts.tracked` pairs each address with a network |

use serde_json::{json, Map, Value};
use shared_types::{normalize_address, MainState};

use crate::envelope::{SchemaVersion, StateEnvelope};
use crate::error::MigrationError;
use crate::runner::{MigrationRunner, MigrationStep};

pub const SEED_VERSION: SchemaVersion = 1;
pub const CURRENT_VERSION: SchemaVersion = 3;

/// Default state at [`SEED_VERSION`].
pub fn seed_state() -> Value {
    json!({
        "accounts": { "addresses": [] },
        "transactions": { "records": [] },
        "networks": {
            "selected": "ethereum",
            "known": [{ "id": "ethereum", "name": "Ethereum", "chain_id": 1 }],
            "status": "disconnected"
        }
    })
}

/// Runner carrying the full wallet chain.
pub fn wallet_migrations() -> Result<MigrationRunner, MigrationError> {
    MigrationRunner::new(SEED_VERSION, CURRENT_VERSION, seed_state())
        .with_step(MigrationStep::new(1, 2, add_tokens_to_track))?
        .with_step(MigrationStep::new(2, 3, pair_accounts_with_network))
}

/// Decode a current-version envelope into the typed state record.
pub fn decode_state(envelope: &StateEnvelope) -> Result<MainState, MigrationError> {
    if envelope.version != CURRENT_VERSION {
        return Err(MigrationError::InvalidEnvelope(format!(
            "cannot decode version {} as version {CURRENT_VERSION}",
            envelope.version
        )));
    }
    serde_json::from_value(envelope.state.clone())
        .map_err(|e| MigrationError::InvalidEnvelope(e.to_string()))
}

fn root(state: &mut Value) -> Result<&mut Map<String, Value>, String> {
    state
        .as_object_mut()
        .ok_or_else(|| "state is not an object".to_string())
}

fn add_tokens_to_track(mut state: Value) -> Result<Value, String> {
    root(&mut state)?
        .entry("tokens_to_track")
        .or_insert_with(|| json!([]));
    Ok(state)
}

fn pair_accounts_with_network(mut state: Value) -> Result<Value, String> {
    let root = root(&mut state)?;
    let network = root
        .get("networks")
        .and_then(|n| n.get("selected"))
        .and_then(Value::as_str)
        .unwrap_or("ethereum")
        .to_string();

    let accounts = root
        .entry("accounts")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| "accounts is not an object".to_string())?;

    let addresses = match accounts.remove("addresses") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => return Err("accounts.addresses is not a list".to_string()),
    };

    let mut tracked = match accounts.remove("tracked") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    for address in addresses {
        let address = address
            .as_str()
            .ok_or_else(|| format!("account address {address} is not a string"))?;
        tracked.push(json!({
            "address": normalize_address(address),
            "network": network,
        }));
    }
    accounts.insert("tracked".to_string(), Value::Array(tracked));
    Ok(state)
}
