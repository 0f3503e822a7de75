//! Error types for state migration

use thiserror::Error;

use crate::envelope::SchemaVersion;

/// Errors raised while migrating a persisted envelope.
///
/// Every variant is fatal to startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MigrationError {
    /// No registered step leaves version `at` on the way to `target`.
    #[error("incompatible schema: no migration from version {at} towards {target}")]
    IncompatibleSchema {
        at: SchemaVersion,
        target: SchemaVersion,
    },

    /// The envelope was written by a newer schema than this build knows.
    #[error("unsupported downgrade: envelope version {declared} is newer than {highest}")]
    UnsupportedDowngrade {
        declared: SchemaVersion,
        highest: SchemaVersion,
    },

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// A step's transform rejected the state it was given.
    #[error("migration {from} -> {to} failed: {reason}")]
    StepFailed {
        from: SchemaVersion,
        to: SchemaVersion,
        reason: String,
    },

    /// A step could not be registered.
    #[error("invalid migration step: {0}")]
    InvalidStep(String),
}
