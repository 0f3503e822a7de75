//! # Observable Store
//!
//! Container for an aggregate state record with merge-based updates and
//! synchronous change notification.
//!
//! ## Guarantees
//!
//! - `update_state` replaces each key present in the patch wholesale; there
//!   is no recursive merge.
//! - Listeners are notified only after the merge completes, with a snapshot
//!   of the full post-merge record, so no listener observes a torn write.
//! - Updates are serialized: the notification for one update finishes before
//!   the next update (from another thread) is merged.
//! - `update_with` computes its patch from the current record under the same
//!   serialization, so concurrent read-modify-write callers never lose keys.
//! - A listener may call `update_state` re-entrantly. The nested patch is
//!   merged at once, but its notification is deferred until the running
//!   dispatch finishes; nested updates are then delivered as one snapshot of
//!   the latest record. Every listener's last snapshot equals `get_state()`.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use shared_types::{MainState, StatePatch};
use tracing::{debug, trace};

use crate::signal::{ListenerId, Signal};

/// A state record that knows how to apply its own partial updates.
pub trait MergeState: Clone + Send + Sync + 'static {
    /// Partial update type.
    type Patch: Send;

    /// Apply `patch`, replacing each present key.
    fn merge(&mut self, patch: Self::Patch);
}

impl MergeState for MainState {
    type Patch = StatePatch;

    fn merge(&mut self, patch: StatePatch) {
        self.apply(patch);
    }
}

/// Observable store over a [`MergeState`] record.
pub struct ObservableStore<S: MergeState> {
    state: RwLock<S>,
    update: Signal<S>,
    write_lock: ReentrantMutex<RefCell<Dispatch>>,
}

/// Notification state of the thread holding `write_lock`.
#[derive(Debug, Default)]
struct Dispatch {
    active: bool,
    pending: bool,
}

/// Clears the dispatch flags even if a listener panics.
struct DispatchGuard<'a>(&'a RefCell<Dispatch>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *self.0.borrow_mut() = Dispatch::default();
    }
}

impl<S: MergeState> ObservableStore<S> {
    /// Create a store holding `initial`.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            state: RwLock::new(initial),
            update: Signal::new("update"),
            write_lock: ReentrantMutex::new(RefCell::new(Dispatch::default())),
        }
    }

    /// Create a shared store.
    #[must_use]
    pub fn shared(initial: S) -> Arc<Self> {
        Arc::new(Self::new(initial))
    }

    /// Snapshot of the current record.
    pub fn get_state(&self) -> S {
        self.state.read().clone()
    }

    /// Merge `patch` and notify "update" listeners with the full record.
    pub fn update_state(&self, patch: S::Patch) {
        self.update_with(|_| Some(patch));
    }

    /// Derive a patch from the current record and merge it atomically.
    ///
    /// `change` returning `None` leaves the store untouched and notifies no
    /// one. Returns whether a patch was merged.
    pub fn update_with<F>(&self, change: F) -> bool
    where
        F: FnOnce(&S) -> Option<S::Patch>,
    {
        let dispatch = self.write_lock.lock();
        let patch = {
            let current = self.state.read();
            change(&*current)
        };
        let Some(patch) = patch else {
            return false;
        };
        let mut snapshot = {
            let mut state = self.state.write();
            state.merge(patch);
            state.clone()
        };

        if dispatch.borrow().active {
            dispatch.borrow_mut().pending = true;
            trace!("Nested update deferred");
            return true;
        }
        dispatch.borrow_mut().active = true;
        let _guard = DispatchGuard(&dispatch);

        loop {
            let notified = self.update.emit(&snapshot);
            debug!(listeners = notified, "State updated");
            if !std::mem::take(&mut dispatch.borrow_mut().pending) {
                return true;
            }
            snapshot = self.state.read().clone();
        }
    }

    /// Attach a persistent "update" listener.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.update.on(listener)
    }

    /// Attach a one-shot "update" listener.
    pub fn once<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.update.once(listener)
    }

    /// Detach an "update" listener.
    pub fn off(&self, id: ListenerId) -> bool {
        self.update.off(id)
    }

    /// The underlying "update" signal.
    pub fn updates(&self) -> &Signal<S> {
        &self.update
    }
}

/// Implement [`MergeState`] for a sub-state that is always replaced whole.
#[macro_export]
macro_rules! replace_on_merge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::store::MergeState for $ty {
                type Patch = $ty;

                fn merge(&mut self, patch: $ty) {
                    *self = patch;
                }
            }
        )*
    };
}

replace_on_merge!(
    shared_types::AccountsState,
    shared_types::NetworksState,
    shared_types::TransactionsState,
);
