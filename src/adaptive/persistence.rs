use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::types::AttemptRecord;

pub const ATTEMPT_LOG_KEY: &str = "attempt_log";
pub const ATTEMPT_LOG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// String slots addressed by key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per slot under `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedAttemptLog {
    version: u32,
    attempts: Vec<AttemptRecord>,
}

/// Versioned attempt log slot on top of a `KeyValueStore`.
#[derive(Clone)]
pub struct AttemptLogRepository {
    store: Arc<dyn KeyValueStore>,
}

impl AttemptLogRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Malformed or foreign-version slots load as empty.
    pub fn load(&self, capacity: usize) -> Vec<AttemptRecord> {
        let raw = match self.store.get(ATTEMPT_LOG_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read attempt log, starting empty");
                return Vec::new();
            }
        };

        let persisted: PersistedAttemptLog = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed attempt log");
                return Vec::new();
            }
        };
        if persisted.version != ATTEMPT_LOG_VERSION {
            tracing::warn!(
                version = persisted.version,
                expected = ATTEMPT_LOG_VERSION,
                "discarding attempt log with unknown version"
            );
            return Vec::new();
        }

        let mut attempts = persisted.attempts;
        let excess = attempts.len().saturating_sub(capacity);
        if excess > 0 {
            attempts.drain(..excess);
        }
        attempts
    }

    pub fn save(&self, attempts: &[AttemptRecord]) -> StoreResult<()> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            version: u32,
            attempts: &'a [AttemptRecord],
        }

        let raw = serde_json::to_string(&Borrowed {
            version: ATTEMPT_LOG_VERSION,
            attempts,
        })?;
        self.store.set(ATTEMPT_LOG_KEY, &raw)
    }
}
