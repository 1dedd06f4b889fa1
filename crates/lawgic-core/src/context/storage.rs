use crate::error::LawgicError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Client-local key/value persistence for serialized history.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, LawgicError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LawgicError>;
    fn remove(&self, key: &str) -> Result<(), LawgicError>;
}

/// Session-scoped storage: lives as long as the process. Clones share the
/// same slots, so a restarted controller can restore from an earlier one.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, LawgicError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LawgicError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LawgicError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// Directory-backed storage, one `<key>.json` file per slot.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn with_dir(base_dir: PathBuf) -> Result<Self, LawgicError> {
        fs::create_dir_all(&base_dir).map_err(|e| {
            LawgicError::Storage(format!("Failed to create storage directory: {}", e))
        })?;

        Ok(Self { base_dir })
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, LawgicError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LawgicError::Storage(format!("Invalid storage key: {key:?}")));
        }
        Ok(self.base_dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, LawgicError> {
        let path = self.slot_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| LawgicError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LawgicError> {
        let path = self.slot_path(key)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            LawgicError::Storage(format!("Failed to write temporary file: {}", e))
        })?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            LawgicError::Storage(format!("Failed to rename {}: {}", tmp_path.display(), e))
        })?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LawgicError> {
        let path = self.slot_path(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                LawgicError::Storage(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}
