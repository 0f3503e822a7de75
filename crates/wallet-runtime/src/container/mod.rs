//! # Runtime Container
//!
//! The orchestrator (`Main`) and the configuration it is built from.
//!
//! - Subsystems are built in dependency order
//! - Subsystems talk only through signals and readiness handles
//! - Background services never block construction

pub mod config;
pub mod orchestrator;

pub use config::{LoggingConfig, NetworkConfig, PersistenceConfig, RuntimeConfig, ServicesConfig};
pub use orchestrator::Main;
