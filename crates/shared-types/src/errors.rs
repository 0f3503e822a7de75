//! # Error Types
//!
//! Defines error types used across services.

use thiserror::Error;

/// Errors raised by the service lifecycle contract.
///
/// `Clone` so a failed readiness future can be observed by every dependent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The startup hook failed; the service stays startable.
    #[error("[{service}] startup failed: {reason}")]
    StartupFailed {
        service: &'static str,
        reason: String,
    },

    /// The shutdown hook failed; the service is still considered stopped.
    #[error("[{service}] shutdown failed: {reason}")]
    ShutdownFailed {
        service: &'static str,
        reason: String,
    },

    /// `start()` was called on a stopped service.
    #[error("[{service}] has been stopped and cannot be restarted")]
    Terminated { service: &'static str },

    /// `start()` was called while another start was still in flight.
    #[error("[{service}] is already starting")]
    AlreadyStarting { service: &'static str },

    /// A dependency failed to become ready.
    #[error("[{service}] dependency {dependency} unavailable: {reason}")]
    DependencyUnavailable {
        service: &'static str,
        dependency: &'static str,
        reason: String,
    },

    /// Construction-time failure (opening storage, loading config, ...).
    #[error("[{service}] construction failed: {reason}")]
    CreationFailed {
        service: &'static str,
        reason: String,
    },
}

impl ServiceError {
    pub fn startup(service: &'static str, reason: impl ToString) -> Self {
        Self::StartupFailed {
            service,
            reason: reason.to_string(),
        }
    }

    pub fn creation(service: &'static str, reason: impl ToString) -> Self {
        Self::CreationFailed {
            service,
            reason: reason.to_string(),
        }
    }

    /// Wrap a dependency's failure as seen by `service`.
    pub fn dependency(service: &'static str, dependency: &'static str, cause: &ServiceError) -> Self {
        Self::DependencyUnavailable {
            service,
            dependency,
            reason: cause.to_string(),
        }
    }
}

/// Failure raised by (or caught around) a subscription handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler rejected notification: {0}")]
    Rejected(String),

    /// The handler panicked; the panic was contained.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn rejected(reason: impl ToString) -> Self {
        Self::Rejected(reason.to_string())
    }
}
