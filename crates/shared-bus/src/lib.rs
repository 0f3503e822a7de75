//! # Shared Bus - Reactive Composition Primitives
//!
//! Everything services use to talk to each other without holding references
//! to one another.
//!
//! ## Building Blocks
//!
//! - [`Signal`]: one named event, persistent (`on`) and one-shot (`once`)
//!   listeners.
//! - [`ObservableStore`]: aggregate record with whole-key merge and
//!   synchronous post-merge notification.
//! - [`DomainService`]: Created → Starting → Running → Stopping → Stopped,
//!   with readiness exposed through [`ServiceHandle`].
//! - [`SubscriptionBroker`]: push notifications to external consumers keyed
//!   by a canonical (route, params) [`Signature`].
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  signal.emit()   ┌──────────────────┐  update  ┌──────────────┐
//! │  Subsystem   │ ───────────────→ │ ObservableStore  │ ───────→ │   Listeners  │
//! └──────────────┘                  └──────────────────┘          └──────┬───────┘
//!                                                                        │ publish()
//!                                                                        ▼
//!                                                              ┌────────────────────┐
//!                                                              │ SubscriptionBroker │
//!                                                              └────────────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broker;
pub mod lifecycle;
pub mod signal;
pub mod store;

pub use broker::{
    HandlerFailure, PublishReport, Signature, Subscriber, SubscriberId, SubscriptionBroker,
    SubscriptionHandler,
};
pub use lifecycle::{start_service, DomainService, ServiceHandle, ServiceLifecycle, ServiceState};
pub use signal::{ListenerId, Signal};
pub use store::{MergeState, ObservableStore};
