//! # Wallet Runtime
//!
//! The background composition layer of a multi-account wallet: builds every
//! subsystem, folds their updates into one observable state record,
//! persists it, and pushes notifications to external subscribers.
//!
//! ## Modular Structure
//!
//! - `container/` - `Main` (the orchestrator) and `RuntimeConfig`
//! - `subsystems/` - networks, transactions, accounts, keys and the
//!   background services (preferences, indexing, chain)
//! - `adapters/` - persistence and price lookups
//! - `wiring/` - signal routing between subsystems, store and broker
//! - `boot` - read → migrate → persist → build
//!
//! ## Data Flow
//!
//! ```text
//! persistence ──read──→ MigrationRunner ──→ Main::new
//!                                             │
//!   subsystems ──update──→ ObservableStore<MainState> ──→ persistence
//!                                             └──────────→ broker "/state/"
//!   chain ──serviceStarted / newAccountToTrack──→ NftsService ──→ broker "/nfts/"
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod api;
pub mod boot;
pub mod container;
pub mod error;
pub mod subsystems;
pub mod wiring;

pub use api::{ApiDescriptor, ImportRequest, NftEvent, ACCOUNTS_ROUTE, NFTS_ROUTE, STATE_ROUTE};
pub use boot::{start_api, Collaborators};
pub use container::{Main, RuntimeConfig};
pub use error::{BootError, RuntimeError};
