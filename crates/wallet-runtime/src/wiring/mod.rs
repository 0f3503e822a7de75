//! # Subsystem Wiring
//!
//! Connects subsystem signals to the aggregate store, persistence and the
//! subscription broker. Subsystems never reference each other directly;
//! every cross-subsystem effect is one of the routes in [`state_routing`].

pub mod state_routing;

pub use state_routing::*;
