//! Error types for the wallet runtime

use shared_types::ServiceError;
use thiserror::Error;
use wb_01_state_migration::MigrationError;

use crate::adapters::persistence::PersistenceError;
use crate::subsystems::keys::KeyError;
use crate::subsystems::networks::ConnectionError;

/// Errors surfaced by [`Main`](crate::Main) operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// An import request carried neither key material nor an address.
    #[error("import request has neither key material nor an address")]
    EmptyImport,

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Errors that abort startup. Nothing is persisted or constructed when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to read persisted state: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("failed to migrate persisted state: {0}")]
    Migration(#[from] MigrationError),
}
