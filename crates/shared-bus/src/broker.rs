//! # Subscription Broker
//!
//! Routes push notifications to external consumers by subscription
//! signature: a route plus a canonical encoding of its parameters.
//!
//! ## Delivery Rules
//!
//! - Subscribers for a signature fire in registration order.
//! - Registration does not deduplicate by id; the same id may appear twice.
//! - A failing (or panicking) handler is contained and reported in the
//!   [`PublishReport`]; the remaining handlers still run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use shared_types::HandlerError;
use tracing::{debug, warn};

/// Subscriber-chosen identifier.
pub type SubscriberId = String;

/// Handler invoked with the notification payload.
pub type SubscriptionHandler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

/// Canonical key derived from a route and its parameters.
///
/// Object keys are sorted recursively before encoding, so two parameter
/// sets that differ only in field order produce the same signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    route: String,
    params: String,
}

impl Signature {
    pub fn new(route: impl Into<String>, params: &Value) -> Self {
        let mut encoded = String::new();
        encode_canonical(params, &mut encoded);
        Self {
            route: route.into(),
            params: encoded,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Canonical parameter encoding.
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.route, self.params)
    }
}

fn encode_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, value)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                encode_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// One registered subscriber.
#[derive(Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    handler: SubscriptionHandler,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// A handler failure recorded during a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub subscriber: SubscriberId,
    pub error: HandlerError,
}

/// Outcome of a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that completed without error.
    pub delivered: usize,
    /// Handlers that failed, in registration order.
    pub failures: Vec<HandlerFailure>,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Maps signatures to ordered subscriber lists.
#[derive(Default)]
pub struct SubscriptionBroker {
    buckets: RwLock<HashMap<Signature, Vec<Subscriber>>>,
}

impl SubscriptionBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber to the bucket for `(route, params)`.
    pub fn register<F>(&self, route: &str, params: &Value, id: impl Into<SubscriberId>, handler: F)
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let signature = Signature::new(route, params);
        let id = id.into();
        debug!(signature = %signature, subscriber = %id, "Subscription registered");
        self.buckets
            .write()
            .entry(signature)
            .or_default()
            .push(Subscriber {
                id,
                handler: Arc::new(handler),
            });
    }

    /// Remove every subscriber with `id` from the bucket for `(route, params)`.
    ///
    /// Returns the number of entries removed.
    pub fn unregister(&self, route: &str, params: &Value, id: &str) -> usize {
        let signature = Signature::new(route, params);
        let mut buckets = self.buckets.write();
        let Some(bucket) = buckets.get_mut(&signature) else {
            return 0;
        };
        let before = bucket.len();
        bucket.retain(|s| s.id != id);
        let removed = before - bucket.len();
        if bucket.is_empty() {
            buckets.remove(&signature);
        }
        debug!(signature = %signature, subscriber = %id, removed, "Subscription removed");
        removed
    }

    /// Deliver `payload` to every subscriber of `(route, params)`.
    pub fn publish(&self, route: &str, params: &Value, payload: &Value) -> PublishReport {
        self.publish_to(&Signature::new(route, params), payload)
    }

    /// Deliver `payload` to every subscriber of `signature`.
    pub fn publish_to(&self, signature: &Signature, payload: &Value) -> PublishReport {
        // Snapshot so handlers can register/unregister without deadlocking.
        let subscribers = match self.buckets.read().get(signature) {
            Some(bucket) => bucket.clone(),
            None => return PublishReport::default(),
        };

        let mut report = PublishReport::default();
        for subscriber in subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(payload)))
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    warn!(
                        signature = %signature,
                        subscriber = %subscriber.id,
                        error = %error,
                        "Subscription handler failed"
                    );
                    report.failures.push(HandlerFailure {
                        subscriber: subscriber.id,
                        error,
                    });
                }
            }
        }
        report
    }

    /// Ids registered for `(route, params)`, in registration order.
    pub fn subscribers(&self, route: &str, params: &Value) -> Vec<SubscriberId> {
        self.buckets
            .read()
            .get(&Signature::new(route, params))
            .map(|bucket| bucket.iter().map(|s| s.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of distinct signatures with at least one subscriber.
    pub fn signature_count(&self) -> usize {
        self.buckets.read().len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
