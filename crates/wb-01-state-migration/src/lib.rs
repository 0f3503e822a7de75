//! # WB-01 State Migration
//!
//! Brings the persisted state envelope up to the current schema version
//! before the state store is built.
//!
//! ## Architecture
//!
//! - **Envelope** (`envelope`): `{version, state}` as read from persistence.
//!   A missing or empty envelope is replaced by the seed-version default state.
//! - **Runner** (`runner`): ordered chain of pure [`MigrationStep`]s.
//! - **Schema** (`schema`): the concrete wallet chain, seed version 1 up to
//!   [`CURRENT_VERSION`].
//!
//! ## Guarantees
//!
//! - `migrate` is pure: it never touches persistence. Either the whole chain
//!   succeeds and the caller persists the result, or it fails and nothing is
//!   written.
//! - A gap in the chain fails with [`MigrationError::IncompatibleSchema`].
//! - A declared version above the highest known one fails with
//!   [`MigrationError::UnsupportedDowngrade`].
//! - Migrating an envelope already at the current version is a no-op.
//!
//! ```text
//! raw envelope ──parse──→ (version, state) ──step v→v+1──→ ... ──→ (CURRENT, state)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod envelope;
pub mod error;
pub mod runner;
pub mod schema;

pub use envelope::{SchemaVersion, StateEnvelope};
pub use error::MigrationError;
pub use runner::{MigrationRunner, MigrationStep};
pub use schema::{decode_state, seed_state, wallet_migrations, CURRENT_VERSION, SEED_VERSION};
