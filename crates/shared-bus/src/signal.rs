//! # Named Signals
//!
//! A `Signal<T>` is the publish-subscribe channel for one named event of a
//! service. Listeners attach in one of two modes:
//!
//! - **persistent** (`on`): fires on every future emission until `off`.
//! - **one-shot** (`once` / `next`): fires on exactly the next emission,
//!   then detaches itself.
//!
//! Dispatch snapshots the listener list under the lock and invokes handlers
//! after releasing it, so a handler may attach or detach listeners without
//! affecting the emission in progress.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

/// Identifier returned when attaching a listener; pass it to `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Persistent,
    Once,
}

struct Listener<T> {
    id: ListenerId,
    mode: Mode,
    handler: Handler<T>,
}

/// Channel for a single named event.
pub struct Signal<T> {
    name: &'static str,
    listeners: Mutex<Vec<Listener<T>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> Signal<T> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Event name, used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Attach a persistent listener.
    pub fn on<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.attach(Mode::Persistent, Arc::new(handler))
    }

    /// Attach a listener that fires on the next emission only.
    pub fn once<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.attach(Mode::Once, Arc::new(handler))
    }

    /// Detach a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        before != listeners.len()
    }

    /// Future resolving with the payload of the next emission.
    ///
    /// Resolves to `None` if the signal is dropped first.
    pub fn next(&self) -> impl Future<Output = Option<T>> + Send + 'static
    where
        T: Clone,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        self.once(move |payload: &T| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(payload.clone());
            }
        });
        async move { rx.await.ok() }
    }

    /// Deliver `payload` to every attached listener, in attach order.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, payload: &T) -> usize {
        let handlers: Vec<Handler<T>> = {
            let mut listeners = self.listeners.lock();
            let handlers = listeners.iter().map(|l| Arc::clone(&l.handler)).collect();
            listeners.retain(|l| l.mode == Mode::Persistent);
            handlers
        };

        trace!(signal = self.name, listeners = handlers.len(), "Signal emitted");

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Number of attached listeners (both modes).
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn attach(&self, mode: Mode, handler: Handler<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Listener { id, mode, handler });
        id
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
