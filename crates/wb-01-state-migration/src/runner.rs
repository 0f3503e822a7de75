//! Migration runner
//!
//! Holds the ordered step chain and applies it to a parsed envelope.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::envelope::{SchemaVersion, StateEnvelope};
use crate::error::MigrationError;

type Transform = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// One pure transform between two adjacent schema versions.
#[derive(Clone)]
pub struct MigrationStep {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    transform: Transform,
}

impl MigrationStep {
    pub fn new<F>(from: SchemaVersion, to: SchemaVersion, transform: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            from,
            to,
            transform: Arc::new(transform),
        }
    }

    fn apply(&self, state: Value) -> Result<Value, MigrationError> {
        (self.transform)(state).map_err(|reason| MigrationError::StepFailed {
            from: self.from,
            to: self.to,
            reason,
        })
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MigrationStep({} -> {})", self.from, self.to)
    }
}

/// Applies registered steps in ascending version order.
pub struct MigrationRunner {
    seed_version: SchemaVersion,
    current: SchemaVersion,
    seed: Value,
    steps: BTreeMap<SchemaVersion, MigrationStep>,
}

impl MigrationRunner {
    /// Runner whose chain starts at `seed_version` (also the version assumed
    /// when an envelope omits one) and ends at `current`.
    ///
    /// `seed` is the default state at `seed_version`, used when nothing has
    /// been persisted yet.
    pub fn new(seed_version: SchemaVersion, current: SchemaVersion, seed: Value) -> Self {
        Self {
            seed_version,
            current,
            seed,
            steps: BTreeMap::new(),
        }
    }

    /// Register a step. Steps must move forward and at most one step may
    /// leave a given version.
    pub fn register(&mut self, step: MigrationStep) -> Result<&mut Self, MigrationError> {
        if step.to <= step.from {
            return Err(MigrationError::InvalidStep(format!(
                "{step:?} does not move forward"
            )));
        }
        if step.from < self.seed_version || step.to > self.current {
            return Err(MigrationError::InvalidStep(format!(
                "{step:?} is outside {}..={}",
                self.seed_version, self.current
            )));
        }
        if let Some(existing) = self.steps.get(&step.from) {
            return Err(MigrationError::InvalidStep(format!(
                "{step:?} conflicts with {existing:?}"
            )));
        }
        self.steps.insert(step.from, step);
        Ok(self)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_step(mut self, step: MigrationStep) -> Result<Self, MigrationError> {
        self.register(step)?;
        Ok(self)
    }

    pub fn current_version(&self) -> SchemaVersion {
        self.current
    }

    pub fn seed_version(&self) -> SchemaVersion {
        self.seed_version
    }

    /// Seed-version envelope used when persistence holds nothing.
    pub fn seed_envelope(&self) -> StateEnvelope {
        StateEnvelope::new(self.seed_version, self.seed.clone())
    }

    /// Migrate a raw persisted envelope to the current version.
    #[instrument(skip_all, fields(target = self.current))]
    pub fn migrate(&self, raw: Option<&Value>) -> Result<StateEnvelope, MigrationError> {
        let envelope = match StateEnvelope::parse(raw, self.seed_version)? {
            Some(envelope) => envelope,
            None => {
                info!(version = self.seed_version, "No persisted state, using seed state");
                self.seed_envelope()
            }
        };
        self.migrate_envelope(envelope)
    }

    /// Migrate an already parsed envelope to the current version.
    pub fn migrate_envelope(&self, envelope: StateEnvelope) -> Result<StateEnvelope, MigrationError> {
        let StateEnvelope { version, mut state } = envelope;
        if version > self.current {
            return Err(MigrationError::UnsupportedDowngrade {
                declared: version,
                highest: self.current,
            });
        }

        let mut at = version;
        while at < self.current {
            let step = self
                .steps
                .get(&at)
                .ok_or(MigrationError::IncompatibleSchema {
                    at,
                    target: self.current,
                })?;
            state = step.apply(state)?;
            info!(from = step.from, to = step.to, "Applied state migration");
            at = step.to;
        }

        debug!(from = version, to = at, "State envelope is current");
        Ok(StateEnvelope::new(at, state))
    }
}

impl fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("seed_version", &self.seed_version)
            .field("current", &self.current)
            .field("steps", &self.steps.values().collect::<Vec<_>>())
            .finish()
    }
}
