//! Key-value persistence and the conversation store built on it.

pub mod conversation;

pub use conversation::{ConversationSnapshot, ConversationStore};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::RelayError;

/// Storage abstraction for persisted state: one string value per key.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, RelayError>;
    fn save(&self, key: &str, value: &str) -> Result<(), RelayError>;
}

/// File-backed store: each key is a `<key>.json` file under `base_dir`.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn new_default() -> Self {
        Self::new(crate::config::default_relay_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", normalize_key(key)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, RelayError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(RelayError::Storage(format!(
                "Cannot read {}: {err}",
                path.display()
            ))),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), RelayError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, value)?;
        Ok(())
    }
}

/// In-memory store, handy for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value.into());
        }
        self
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, RelayError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RelayError::Storage("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), RelayError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RelayError::Storage("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn normalize_key(key: &str) -> String {
    let cleaned: String = key
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
