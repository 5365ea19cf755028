//! Key-value storage for the trained model snapshot

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{EstateError, EstateResult};

/// Key under which the trained model is persisted.
pub const MODEL_KEY: &str = "trainedModel";

pub trait ModelStore: Send + Sync {
    fn get(&self, key: &str) -> EstateResult<Option<String>>;

    /// Overwrites any previous value.
    fn set(&self, key: &str, value: &str) -> EstateResult<()>;

    fn remove(&self, key: &str) -> EstateResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for MemoryStore {
    fn get(&self, key: &str) -> EstateResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| EstateError::Store("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> EstateResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EstateError::Store("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> EstateResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EstateError::Store("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
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

    fn path_for(&self, key: &str) -> EstateResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(EstateError::Store(format!("invalid key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl ModelStore for FileStore {
    fn get(&self, key: &str) -> EstateResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> EstateResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write-then-rename so a crash never leaves a truncated snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> EstateResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryStore::new();
        assert_eq!(store.get(MODEL_KEY).unwrap(), None);

        store.set(MODEL_KEY, "first").unwrap();
        store.set(MODEL_KEY, "second").unwrap();
        assert_eq!(store.get(MODEL_KEY).unwrap().as_deref(), Some("second"));

        store.remove(MODEL_KEY).unwrap();
        assert_eq!(store.get(MODEL_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("models");

        FileStore::new(&nested).set(MODEL_KEY, r#"{"w":[1,2]}"#).unwrap();
        assert!(nested.join("trainedModel.json").exists());

        let reopened = FileStore::new(&nested);
        assert_eq!(
            reopened.get(MODEL_KEY).unwrap().as_deref(),
            Some(r#"{"w":[1,2]}"#)
        );
        assert!(!nested.join("trainedModel.json.tmp").exists());
    }

    #[test]
    fn file_store_missing_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("absent").unwrap(), None);
        store.remove("absent").unwrap();
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(EstateError::Store(_))
        ));
    }
}
