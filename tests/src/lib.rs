//! # Wallet Background Test Suite
//!
//! Cross-crate flows driven through the public surface of `wallet-runtime`.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Store, broker and migration throughput
//! └── src/integration/
//!     ├── boot_flows.rs          # read → migrate → persist → build
//!     ├── discovery_flows.rs     # chain signals → NFT fetch → "/nfts/"
//!     └── subscription_flows.rs  # registration, delivery, isolation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p wb-tests
//! cargo bench -p wb-tests
//! ```

pub mod integration;
