//! # Service Lifecycle
//!
//! The contract every long-running subsystem implements.
//!
//! ```text
//! Created ──start()──→ Starting ──hook ok──→ Running ──stop()──→ Stopping ──→ Stopped
//!    ↑                    │
//!    └─────hook failed────┘
//! ```
//!
//! - `start()` on a Running service is a no-op; the startup hook runs at most
//!   once per successful start.
//! - `stop()` is safe on a service that was never started and is a no-op
//!   once Stopped. Stopped is terminal.
//! - Dependents wait on a [`ServiceHandle`], a shared future resolving to the
//!   started service, so nobody observes a half-initialized dependency.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use shared_types::ServiceError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::signal::Signal;

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Lifecycle bookkeeping embedded in every service.
pub struct ServiceLifecycle {
    name: &'static str,
    state: watch::Sender<ServiceState>,
    /// Fires once per successful start.
    pub service_started: Signal<()>,
    /// Fires when the service reaches Stopped.
    pub service_stopped: Signal<()>,
}

impl ServiceLifecycle {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(ServiceState::Created);
        Self {
            name,
            state,
            service_started: Signal::new("serviceStarted"),
            service_stopped: Signal::new("serviceStopped"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Resolves once the service is Running (immediately if it already is).
    ///
    /// Returns `false` if the service stopped without ever running.
    pub async fn wait_until_running(&self) -> bool {
        let mut rx = self.state.subscribe();
        let reached = rx
            .wait_for(|s| matches!(s, ServiceState::Running | ServiceState::Stopped))
            .await
            .map(|s| *s == ServiceState::Running);
        reached.unwrap_or(false)
    }

    fn transition(&self, next: ServiceState) {
        let previous = self.state.send_replace(next);
        debug!(service = self.name, from = ?previous, to = ?next, "Lifecycle transition");
    }
}

impl std::fmt::Debug for ServiceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLifecycle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Contract shared by every long-running subsystem.
///
/// Implementors supply the hooks; `start`/`stop` drive the state machine.
/// Not designed for concurrent `start`/`stop` calls on the same instance.
#[async_trait]
pub trait DomainService: Send + Sync {
    fn lifecycle(&self) -> &ServiceLifecycle;

    /// Startup hook. Must fully complete before the service is Running.
    async fn internal_start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Shutdown hook. Releases owned resources.
    async fn internal_stop(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let lifecycle = self.lifecycle();
        let service = lifecycle.name();
        match lifecycle.state() {
            ServiceState::Running => return Ok(()),
            ServiceState::Starting => return Err(ServiceError::AlreadyStarting { service }),
            ServiceState::Stopping | ServiceState::Stopped => {
                return Err(ServiceError::Terminated { service })
            }
            ServiceState::Created => {}
        }

        lifecycle.transition(ServiceState::Starting);
        if let Err(e) = self.internal_start().await {
            warn!(service, error = %e, "Service failed to start");
            lifecycle.transition(ServiceState::Created);
            return Err(e);
        }
        lifecycle.transition(ServiceState::Running);
        info!(service, "Service started");
        lifecycle.service_started.emit(&());
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let lifecycle = self.lifecycle();
        if matches!(
            lifecycle.state(),
            ServiceState::Stopping | ServiceState::Stopped
        ) {
            return Ok(());
        }

        lifecycle.transition(ServiceState::Stopping);
        let result = self.internal_stop().await;
        lifecycle.transition(ServiceState::Stopped);
        match &result {
            Ok(()) => info!(service = lifecycle.name(), "Service stopped"),
            Err(e) => warn!(service = lifecycle.name(), error = %e, "Service stopped uncleanly"),
        }
        lifecycle.service_stopped.emit(&());
        result
    }
}

type Readiness<S> = Shared<BoxFuture<'static, Result<Arc<S>, ServiceError>>>;

/// Cloneable future handle to a service that may not be ready yet.
pub struct ServiceHandle<S> {
    inner: Readiness<S>,
}

impl<S> Clone for ServiceHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> ServiceHandle<S> {
    /// Wrap a future that yields the ready service.
    pub fn new<F>(ready: F) -> Self
    where
        F: Future<Output = Result<Arc<S>, ServiceError>> + Send + 'static,
    {
        Self {
            inner: ready.boxed().shared(),
        }
    }

    /// A handle that is already resolved.
    pub fn ready(service: Arc<S>) -> Self {
        Self::new(async move { Ok(service) })
    }

    /// Wait until the service is ready.
    pub async fn wait(&self) -> Result<Arc<S>, ServiceError> {
        self.inner.clone().await
    }

    /// The service if it has already resolved, without waiting.
    pub fn peek(&self) -> Option<Result<Arc<S>, ServiceError>> {
        self.inner.peek().cloned()
    }

    /// Drive the handle to completion on the runtime even if nobody awaits it.
    pub fn spawn(&self) {
        let readiness = self.inner.clone();
        tokio::spawn(async move {
            let _ = readiness.await;
        });
    }
}

/// Two-phase service startup: construct (awaiting dependencies inside
/// `create`), then `start()`. The returned handle resolves to the Running
/// service and is driven on the runtime immediately.
pub fn start_service<S, F>(create: F) -> ServiceHandle<S>
where
    S: DomainService + 'static,
    F: Future<Output = Result<Arc<S>, ServiceError>> + Send + 'static,
{
    let handle = ServiceHandle::new(async move {
        let service = create.await?;
        service.start().await?;
        Ok::<_, ServiceError>(service)
    });
    handle.spawn();
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    struct Probe {
        lifecycle: ServiceLifecycle,
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail_start: bool,
    }

    impl Probe {
        fn new(fail_start: bool) -> Self {
            Self {
                lifecycle: ServiceLifecycle::new("probe"),
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                fail_start,
            }
        }
    }

    #[async_trait]
    impl DomainService for Probe {
        fn lifecycle(&self) -> &ServiceLifecycle {
            &self.lifecycle
        }

        async fn internal_start(&self) -> Result<(), ServiceError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_start {
                return Err(ServiceError::startup("probe", "refused"));
            }
            Ok(())
        }

        async fn internal_stop(&self) -> Result<(), ServiceError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_twice_runs_hook_once() {
        let probe = Probe::new(false);
        probe.start().await.unwrap();
        probe.start().await.unwrap();

        assert_eq!(probe.starts.load(Ordering::SeqCst), 1);
        assert_eq!(probe.lifecycle.state(), ServiceState::Running);
    }

    #[tokio::test]
    async fn test_service_started_fires_after_running() {
        let probe = Arc::new(Probe::new(false));
        let observed = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&observed);
        let inner = Arc::clone(&probe);
        probe.lifecycle.service_started.once(move |_| {
            *sink.lock() = Some(inner.lifecycle.state());
        });

        probe.start().await.unwrap();
        assert_eq!(*observed.lock(), Some(ServiceState::Running));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let probe = Probe::new(false);
        probe.stop().await.unwrap();
        probe.stop().await.unwrap();

        assert_eq!(probe.lifecycle.state(), ServiceState::Stopped);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stopped_is_terminal() {
        let probe = Probe::new(false);
        probe.start().await.unwrap();
        probe.stop().await.unwrap();

        let err = probe.start().await.unwrap_err();
        assert_eq!(err, ServiceError::Terminated { service: "probe" });
    }

    #[tokio::test]
    async fn test_failed_start_returns_to_created() {
        let probe = Probe::new(true);
        assert!(probe.start().await.is_err());
        assert_eq!(probe.lifecycle.state(), ServiceState::Created);
    }

    #[tokio::test]
    async fn test_wait_until_running() {
        let probe = Arc::new(Probe::new(false));
        let waiter = {
            let probe = Arc::clone(&probe);
            tokio::spawn(async move { probe.lifecycle.wait_until_running().await })
        };

        probe.start().await.unwrap();
        let reached = timeout(Duration::from_millis(200), waiter)
            .await
            .expect("timeout")
            .unwrap();
        assert!(reached);
        // Already running: resolves immediately.
        assert!(probe.lifecycle.wait_until_running().await);
    }

    #[tokio::test]
    async fn test_start_service_resolves_to_running_instance() {
        let handle = start_service(async { Ok(Arc::new(Probe::new(false))) });
        let probe = timeout(Duration::from_millis(200), handle.wait())
            .await
            .expect("timeout")
            .unwrap();

        assert!(probe.lifecycle.is_running());
        // A second waiter gets the same instance.
        let again = handle.wait().await.unwrap();
        assert!(Arc::ptr_eq(&probe, &again));
    }

    #[tokio::test]
    async fn test_dependent_waits_for_dependency() {
        let dependency = start_service(async { Ok(Arc::new(Probe::new(false))) });
        let dep = dependency.clone();
        let dependent = start_service(async move {
            let upstream = dep.wait().await?;
            assert!(upstream.lifecycle.is_running());
            Ok::<_, ServiceError>(Arc::new(Probe::new(false)))
        });

        assert!(timeout(Duration::from_millis(200), dependent.wait())
            .await
            .expect("timeout")
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_dependency_propagates() {
        let dependency = start_service(async { Ok(Arc::new(Probe::new(true))) });
        let err = dependency.wait().await.err().unwrap();
        assert!(matches!(err, ServiceError::StartupFailed { .. }));
        assert!(dependency.peek().is_some());
    }
}
