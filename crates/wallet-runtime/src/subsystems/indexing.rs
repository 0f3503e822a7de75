//! # Indexing Service
//!
//! Background service keeping the list of fungible assets whose balances
//! and prices are tracked. Depends on the preference service: construction
//! waits for it, and preference changes flow into the tracked list.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::{DomainService, ListenerId, ServiceHandle, ServiceLifecycle, Signal};
use shared_types::{FungibleAsset, ServiceError};
use tracing::{debug, info, instrument};

use super::preferences::{PreferenceService, Preferences};

const SERVICE: &str = "indexing";

pub struct IndexingService {
    me: Weak<IndexingService>,
    lifecycle: ServiceLifecycle,
    preferences: Arc<PreferenceService>,
    tokens: RwLock<Vec<FungibleAsset>>,
    preferences_listener: Mutex<Option<ListenerId>>,

    /// Fires with the full tracked list whenever it changes.
    pub tokens_updated: Signal<Vec<FungibleAsset>>,
}

impl IndexingService {
    #[instrument(name = "indexing_create", skip_all)]
    pub async fn create(
        preferences: ServiceHandle<PreferenceService>,
    ) -> Result<Arc<Self>, ServiceError> {
        let preferences = preferences
            .wait()
            .await
            .map_err(|e| ServiceError::dependency(SERVICE, "preferences", &e))?;
        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            lifecycle: ServiceLifecycle::new(SERVICE),
            preferences,
            tokens: RwLock::new(Vec::new()),
            preferences_listener: Mutex::new(None),
            tokens_updated: Signal::new("tokensUpdated"),
        }))
    }

    pub fn tokens(&self) -> Vec<FungibleAsset> {
        self.tokens.read().clone()
    }

    /// Add `asset` to the tracked list. Returns `false` if already tracked.
    pub fn track_token(&self, asset: FungibleAsset) -> bool {
        let snapshot = {
            let mut tokens = self.tokens.write();
            if tokens.contains(&asset) {
                return false;
            }
            tokens.push(asset);
            tokens.clone()
        };
        self.publish(snapshot);
        true
    }

    fn merge_preferences(&self, preferences: &Preferences) {
        let snapshot = {
            let mut tokens = self.tokens.write();
            let before = tokens.len();
            for asset in &preferences.tokens {
                if !tokens.contains(asset) {
                    tokens.push(asset.clone());
                }
            }
            if tokens.len() == before {
                return;
            }
            tokens.clone()
        };
        self.publish(snapshot);
    }

    fn publish(&self, tokens: Vec<FungibleAsset>) {
        info!(tokens = tokens.len(), "Tracked assets updated");
        self.tokens_updated.emit(&tokens);
    }
}

#[async_trait]
impl DomainService for IndexingService {
    fn lifecycle(&self) -> &ServiceLifecycle {
        &self.lifecycle
    }

    async fn internal_start(&self) -> Result<(), ServiceError> {
        let initial = self.preferences.tokens_to_track();
        debug!(tokens = initial.len(), "Loading tracked assets from preferences");
        *self.tokens.write() = initial.clone();

        let me = self.me.clone();
        let id = self
            .preferences
            .preferences_changed
            .on(move |preferences: &Preferences| {
                if let Some(indexing) = me.upgrade() {
                    indexing.merge_preferences(preferences);
                }
            });
        *self.preferences_listener.lock() = Some(id);

        self.publish(initial);
        Ok(())
    }

    async fn internal_stop(&self) -> Result<(), ServiceError> {
        if let Some(id) = self.preferences_listener.lock().take() {
            self.preferences.preferences_changed.off(id);
        }
        Ok(())
    }
}
