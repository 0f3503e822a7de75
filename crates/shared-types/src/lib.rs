//! # Shared Types Crate
//!
//! This crate contains the aggregate wallet state record, the entities every
//! subsystem exchanges, and the error types of the service contract.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Key Ownership**: Each top-level key of [`MainState`] is owned by one
//!   subsystem and is only ever replaced as a whole.
//! - **No Infrastructure**: Nothing here performs I/O.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
