//! Persisted state envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MigrationError;

/// Schema version number. Versions are totally ordered.
pub type SchemaVersion = u32;

/// `{version, state}` as stored under the well-known state key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    pub version: SchemaVersion,
    pub state: Value,
}

impl StateEnvelope {
    pub fn new(version: SchemaVersion, state: Value) -> Self {
        Self { version, state }
    }

    /// Parse whatever persistence returned.
    ///
    /// Returns `Ok(None)` for an absent, `null` or `{}` envelope. A missing
    /// `version` field reads as `unversioned`.
    pub fn parse(
        raw: Option<&Value>,
        unversioned: SchemaVersion,
    ) -> Result<Option<Self>, MigrationError> {
        let object = match raw {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(map)) if map.is_empty() => return Ok(None),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(MigrationError::InvalidEnvelope(format!(
                    "expected an object, found {}",
                    kind_of(other)
                )))
            }
        };

        let version = match object.get("version") {
            None | Some(Value::Null) => unversioned,
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| SchemaVersion::try_from(v).ok())
                .ok_or_else(|| {
                    MigrationError::InvalidEnvelope(format!("version {n} is not a valid version"))
                })?,
            Some(other) => {
                return Err(MigrationError::InvalidEnvelope(format!(
                    "version must be a number, found {}",
                    kind_of(other)
                )))
            }
        };

        let state = object
            .get("state")
            .cloned()
            .ok_or_else(|| MigrationError::InvalidEnvelope("missing state".to_string()))?;
        if !state.is_object() {
            return Err(MigrationError::InvalidEnvelope(format!(
                "state must be an object, found {}",
                kind_of(&state)
            )));
        }

        Ok(Some(Self { version, state }))
    }

    /// JSON form written back to persistence.
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "version": self.version, "state": self.state })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
