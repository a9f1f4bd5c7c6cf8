//! Durable storage for the selected workspace id.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::workspace::CURRENT_WORKSPACE_KEY;

/// Where the store remembers the last selected workspace.
///
/// Operations never fail from the caller's point of view; a backend that
/// cannot read or write logs and behaves as if nothing were stored.
pub trait SelectionStorage: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, workspace_id: &str);
    fn remove(&self);
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(workspace_id: &str) -> Self {
        Self {
            value: Mutex::new(Some(workspace_id.to_string())),
        }
    }
}

impl SelectionStorage for MemoryStorage {
    fn get(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, workspace_id: &str) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(workspace_id.to_string());
    }

    fn remove(&self) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// A JSON key/value file, one entry per key, like a browser's local storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn load(&self) -> BTreeMap<String, String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable storage file: {}", e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read storage file: {}", e);
                BTreeMap::new()
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("tmp");
            std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
            std::fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), "Failed to write storage file: {}", e);
        }
    }
}

impl SelectionStorage for FileStorage {
    fn get(&self) -> Option<String> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().remove(CURRENT_WORKSPACE_KEY)
    }

    fn set(&self, workspace_id: &str) {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load();
        entries.insert(CURRENT_WORKSPACE_KEY.to_string(), workspace_id.to_string());
        self.save(&entries);
    }

    fn remove(&self) {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load();
        if entries.remove(CURRENT_WORKSPACE_KEY).is_some() {
            self.save(&entries);
        }
    }
}
