//! # State Persistence
//!
//! Key-value persistence for the state envelope and preferences.
//!
//! - `InMemoryPersistence`: process-local map, used by tests and ephemeral runs.
//! - `JsonFilePersistence`: one `<key>.json` file per key under a data dir.
//!   Writes go to a temp file first and are renamed into place.
//! - `StatePersister`: background writer that applies queued writes in order,
//!   so state listeners never block on I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Persistence failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt value under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

/// External key-value persistence layer.
#[async_trait]
pub trait StatePersistence: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    async fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError>;
}

/// Persistence held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    entries: RwLock<HashMap<String, Value>>,
    writes: Mutex<Vec<String>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `key`.
    pub fn with_entry(self, key: impl Into<String>, value: Value) -> Self {
        self.entries.write().insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Keys written so far, in write order.
    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl StatePersistence for InMemoryPersistence {
    async fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        self.entries.write().insert(key.to_string(), value.clone());
        self.writes.lock().push(key.to_string());
        Ok(())
    }
}

/// Persistence backed by JSON files.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl StatePersistence for JsonFilePersistence {
    async fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        let bytes = serde_json::to_vec_pretty(value).map_err(|e| PersistenceError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error(&path))?;
        debug!(key, path = %path.display(), "State written");
        Ok(())
    }
}

enum Command {
    Write(Value),
    Flush(oneshot::Sender<()>),
}

/// Ordered background writer for one key.
pub struct StatePersister {
    key: String,
    tx: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StatePersister {
    /// Spawn the writer task. Must be called inside a Tokio runtime.
    pub fn spawn(persistence: Arc<dyn StatePersistence>, key: impl Into<String>) -> Self {
        let key = key.into();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Write(value) => {
                        if let Err(e) = persistence.write(&task_key, &value).await {
                            warn!(key = %task_key, error = %e, "Failed to persist state");
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self {
            key,
            tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Queue a write. Never blocks.
    pub fn persist(&self, value: Value) {
        if self.tx.send(Command::Write(value)).is_err() {
            warn!(key = %self.key, "State writer has stopped; dropping write");
        }
    }

    /// Wait until every write queued so far has been applied.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Flush, then stop the writer task.
    pub async fn close(&self) {
        self.flush().await;
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.abort();
        }
    }
}
