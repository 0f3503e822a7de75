//! Adapters Layer

pub mod memory;

pub use memory::{InMemoryNftFetcher, InMemoryNftStore};
