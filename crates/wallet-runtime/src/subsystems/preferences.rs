//! # Preference Service
//!
//! Background service holding user preferences: display currency and the
//! fungible assets whose balances should be tracked. Loaded from the
//! persistence layer at construction; every change is written back.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_bus::{DomainService, ServiceLifecycle, Signal};
use shared_types::{FungibleAsset, NetworkId, ServiceError};
use tracing::{debug, info, instrument};

use crate::adapters::persistence::{PersistenceError, StatePersistence};

const SERVICE: &str = "preferences";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub currency: String,
    pub tokens: Vec<FungibleAsset>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            tokens: vec![FungibleAsset {
                symbol: "DAI".to_string(),
                contract_address: "0x6b175474e89094c44da98b954eedeac495271d0f".to_string(),
                network: NetworkId::default(),
                decimals: 18,
            }],
        }
    }
}

pub struct PreferenceService {
    lifecycle: ServiceLifecycle,
    persistence: Arc<dyn StatePersistence>,
    key: String,
    current: RwLock<Preferences>,

    /// Fires with the full record after every change.
    pub preferences_changed: Signal<Preferences>,
}

impl PreferenceService {
    /// Load preferences stored under `key`, falling back to defaults.
    #[instrument(name = "preferences_create", skip(persistence))]
    pub async fn create(
        persistence: Arc<dyn StatePersistence>,
        key: String,
    ) -> Result<Arc<Self>, ServiceError> {
        let stored = persistence
            .read(&key)
            .await
            .map_err(|e| ServiceError::creation(SERVICE, e))?;
        let current = match stored {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| ServiceError::creation(SERVICE, e))?
            }
            None => {
                debug!("No stored preferences; using defaults");
                Preferences::default()
            }
        };

        Ok(Arc::new(Self {
            lifecycle: ServiceLifecycle::new(SERVICE),
            persistence,
            key,
            current: RwLock::new(current),
            preferences_changed: Signal::new("preferencesChanged"),
        }))
    }

    pub fn get(&self) -> Preferences {
        self.current.read().clone()
    }

    pub fn tokens_to_track(&self) -> Vec<FungibleAsset> {
        self.current.read().tokens.clone()
    }

    /// Apply `change`, persist the result and announce it.
    pub async fn update<F>(&self, change: F) -> Result<Preferences, PersistenceError>
    where
        F: FnOnce(&mut Preferences) + Send,
    {
        let next = {
            let mut current = self.current.write();
            change(&mut current);
            current.clone()
        };
        let value = serde_json::to_value(&next).map_err(|e| PersistenceError::Corrupt {
            key: self.key.clone(),
            reason: e.to_string(),
        })?;
        self.persistence.write(&self.key, &value).await?;

        info!(currency = %next.currency, tokens = next.tokens.len(), "Preferences updated");
        self.preferences_changed.emit(&next);
        Ok(next)
    }
}

#[async_trait]
impl DomainService for PreferenceService {
    fn lifecycle(&self) -> &ServiceLifecycle {
        &self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryPersistence;
    use serde_json::json;

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let service = PreferenceService::create(Arc::new(InMemoryPersistence::new()), "prefs".into())
            .await
            .unwrap();
        assert_eq!(service.get(), Preferences::default());
    }

    #[tokio::test]
    async fn test_loads_stored_record() {
        let backend = InMemoryPersistence::new()
            .with_entry("prefs", json!({ "currency": "EUR", "tokens": [] }));
        let service = PreferenceService::create(Arc::new(backend), "prefs".into())
            .await
            .unwrap();

        assert_eq!(service.get().currency, "EUR");
        assert!(service.tokens_to_track().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_creation() {
        let backend = InMemoryPersistence::new().with_entry("prefs", json!({ "currency": 7 }));
        let err = PreferenceService::create(Arc::new(backend), "prefs".into())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::CreationFailed { .. }));
    }

    #[tokio::test]
    async fn test_update_persists_and_emits() {
        let backend = Arc::new(InMemoryPersistence::new());
        let service = PreferenceService::create(backend.clone(), "prefs".into())
            .await
            .unwrap();
        let changed = service.preferences_changed.next();

        service
            .update(|p| p.currency = "GBP".to_string())
            .await
            .unwrap();

        assert_eq!(changed.await.unwrap().currency, "GBP");
        assert_eq!(backend.get("prefs").unwrap()["currency"], "GBP");
    }
}
