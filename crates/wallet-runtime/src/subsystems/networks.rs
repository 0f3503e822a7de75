//! # Networks Subsystem
//!
//! Owns the `networks` key: the selected network, the known networks and
//! the connection status of the selected provider.
//!
//! Connection changes reported by the provider are folded into the
//! sub-state, which then flows to the aggregate store like any other update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::{ListenerId, ObservableStore, Signal};
use shared_types::{ConnectionStatus, NetworkDescriptor, NetworksState};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("provider for {network} unreachable: {reason}")]
    Unreachable { network: String, reason: String },
}

/// Connection to a remote ledger.
#[async_trait]
pub trait NetworkConnection: Send + Sync {
    fn network(&self) -> &NetworkDescriptor;

    /// Open the connection. A no-op when already open.
    async fn open(&self) -> Result<(), ConnectionError>;

    /// Close the connection. A no-op when already closed.
    async fn close(&self) -> Result<(), ConnectionError>;

    fn is_open(&self) -> bool;

    /// Fires on every actual status change.
    fn status_changes(&self) -> &Signal<ConnectionStatus>;
}

/// Provider handle for the selected network.
///
/// The wire protocol is not modelled; the provider tracks whether it is
/// open and reports transitions.
pub struct Provider {
    network: NetworkDescriptor,
    rpc_url: String,
    open: AtomicBool,
    status: Signal<ConnectionStatus>,
}

impl Provider {
    pub fn new(network: NetworkDescriptor, rpc_url: impl Into<String>) -> Self {
        Self {
            network,
            rpc_url: rpc_url.into(),
            open: AtomicBool::new(false),
            status: Signal::new("connectionStatus"),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn transition(&self, open: bool) {
        if self.open.swap(open, Ordering::SeqCst) == open {
            debug!(network = %self.network.id, open, "Provider already in requested state");
            return;
        }
        let status = if open {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        info!(network = %self.network.id, url = %self.rpc_url, ?status, "Provider status changed");
        self.status.emit(&status);
    }
}

#[async_trait]
impl NetworkConnection for Provider {
    fn network(&self) -> &NetworkDescriptor {
        &self.network
    }

    async fn open(&self) -> Result<(), ConnectionError> {
        self.transition(true);
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.transition(false);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn status_changes(&self) -> &Signal<ConnectionStatus> {
        &self.status
    }
}

/// Network subsystem.
pub struct Networks {
    store: Arc<ObservableStore<NetworksState>>,
    selected: RwLock<Arc<dyn NetworkConnection>>,
    status_listener: Mutex<Option<(Arc<dyn NetworkConnection>, ListenerId)>>,
}

impl Networks {
    /// Build from the persisted sub-state and the selected connection.
    ///
    /// A persisted status is stale by definition and is reset to the
    /// connection's actual status.
    pub fn new(initial: NetworksState, connection: Arc<dyn NetworkConnection>) -> Arc<Self> {
        let mut initial = initial;
        initial.selected = connection.network().id.clone();
        initial.status = status_of(connection.as_ref());
        if !initial.known.iter().any(|n| n.id == initial.selected) {
            initial.known.push(connection.network().clone());
        }

        let networks = Arc::new(Self {
            store: ObservableStore::shared(initial),
            selected: RwLock::new(Arc::clone(&connection)),
            status_listener: Mutex::new(None),
        });
        networks.follow(connection);
        networks
    }

    pub fn state(&self) -> NetworksState {
        self.store.get_state()
    }

    /// "update" signal carrying the full sub-state.
    pub fn updates(&self) -> &Signal<NetworksState> {
        self.store.updates()
    }

    /// The currently selected connection.
    pub fn selected(&self) -> Arc<dyn NetworkConnection> {
        Arc::clone(&self.selected.read())
    }

    /// Switch to another connection. The previous one is left as is.
    pub fn select(&self, connection: Arc<dyn NetworkConnection>) {
        info!(network = %connection.network().id, "Selecting network");
        *self.selected.write() = Arc::clone(&connection);
        self.follow(connection);
    }

    fn follow(&self, connection: Arc<dyn NetworkConnection>) {
        if let Some((previous, id)) = self.status_listener.lock().take() {
            previous.status_changes().off(id);
        }

        let store = Arc::clone(&self.store);
        let id = connection.status_changes().on(move |status: &ConnectionStatus| {
            store.update_with(|state: &NetworksState| {
                let mut next = state.clone();
                next.status = *status;
                Some(next)
            });
        });
        *self.status_listener.lock() = Some((Arc::clone(&connection), id));

        let descriptor = connection.network().clone();
        let status = status_of(connection.as_ref());
        self.store.update_with(|current: &NetworksState| {
            let mut next = current.clone();
            next.selected = descriptor.id.clone();
            next.status = status;
            if !next.known.iter().any(|n| n.id == descriptor.id) {
                next.known.push(descriptor);
            }
            (next != *current).then_some(next)
        });
    }
}

fn status_of(connection: &dyn NetworkConnection) -> ConnectionStatus {
    if connection.is_open() {
        ConnectionStatus::Connected
    } else {
        ConnectionStatus::Disconnected
    }
}
