//! # Key Management
//!
//! Stores imported credentials and hands back the address each one controls.
//! Owned exclusively by the orchestrator; nothing else holds a reference.
//!
//! Key derivation proper is an external concern. Addresses here are derived
//! as the last 20 bytes of the Keccak-256 digest of the key material, which
//! is enough to give every credential a stable, distinct address.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key must be 32 bytes of hex")]
    InvalidPrivateKey,

    #[error("mnemonic must have 12, 15, 18, 21 or 24 words, got {0}")]
    InvalidMnemonic(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    PrivateKey,
    Mnemonic,
}

/// Raw key material handed to `import`.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyImport {
    pub kind: KeyKind,
    pub data: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl std::fmt::Debug for KeyImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyImport")
            .field("kind", &self.kind)
            .field("data", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// A stored credential. The key material itself is never kept in clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    pub id: Uuid,
    pub address: String,
    pub kind: KeyKind,
    pub name: Option<String>,
    /// First four digest bytes, hex.
    pub fingerprint: String,
}

#[derive(Debug, Default)]
pub struct Keys {
    stored: RwLock<Vec<StoredKey>>,
}

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a credential and return the address it controls.
    ///
    /// Importing the same material twice returns the existing address.
    pub fn import(&self, request: KeyImport) -> Result<String, KeyError> {
        let digest = digest_material(&request)?;
        let address = format!("0x{}", hex::encode(&digest[12..]));

        let mut stored = self.stored.write();
        if stored.iter().any(|k| k.address == address) {
            debug!(%address, "Key already imported");
            return Ok(address);
        }
        let key = StoredKey {
            id: Uuid::new_v4(),
            address: address.clone(),
            kind: request.kind,
            name: request.name,
            fingerprint: hex::encode(&digest[..4]),
        };
        info!(id = %key.id, %address, kind = ?key.kind, "Key imported");
        stored.push(key);
        Ok(address)
    }

    pub fn addresses(&self) -> Vec<String> {
        self.stored.read().iter().map(|k| k.address.clone()).collect()
    }

    pub fn get(&self, address: &str) -> Option<StoredKey> {
        self.stored
            .read()
            .iter()
            .find(|k| k.address == address)
            .cloned()
    }
}

fn digest_material(request: &KeyImport) -> Result<[u8; 32], KeyError> {
    let material = match request.kind {
        KeyKind::PrivateKey => {
            let body = request.data.trim();
            let body = body.strip_prefix("0x").unwrap_or(body);
            match hex::decode(body) {
                Ok(bytes) if bytes.len() == 32 => bytes,
                _ => return Err(KeyError::InvalidPrivateKey),
            }
        }
        KeyKind::Mnemonic => {
            let words: Vec<String> = request
                .data
                .split_whitespace()
                .map(str::to_lowercase)
                .collect();
            if !matches!(words.len(), 12 | 15 | 18 | 21 | 24) {
                return Err(KeyError::InvalidMnemonic(words.len()));
            }
            words.join(" ").into_bytes()
        }
    };
    Ok(Keccak256::digest(&material).into())
}
