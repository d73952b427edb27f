/// Persistent key-value store used for save records.
///
/// Records are opaque strings replaced whole on every `put`; there are no
/// partial field updates.

use rustc_hash::FxHashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store key: '{0}'")]
    InvalidKey(String),
}

/// A durable key-value store.
pub trait PersistentStore {
    fn put(&mut self, key: &str, record: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store. Lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: FxHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn put(&mut self, key: &str, record: &str) -> Result<(), StoreError> {
        self.records.insert(key.to_string(), record.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.records.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key.
///
/// Writes go to a temp file that is then renamed over the record, so a
/// reader never observes a half-written record.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if it doesn't exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<FileStore, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl PersistentStore for FileStore {
    fn put(&mut self, key: &str, record: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, record)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
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
    use tempfile::TempDir;

    #[test]
    fn memory_store_put_get_delete() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.put("k", "one").unwrap();
        store.put("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));

        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_replaces_whole_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new(temp_dir.path()).unwrap();

        store.put("vn_save_v1", r#"{"sceneId":"a"}"#).unwrap();
        store.put("vn_save_v1", r#"{"sceneId":"b"}"#).unwrap();
        assert_eq!(
            store.get("vn_save_v1").unwrap().as_deref(),
            Some(r#"{"sceneId":"b"}"#)
        );
        assert!(temp_dir.path().join("vn_save_v1.json").exists());
        assert!(!temp_dir.path().join("vn_save_v1.json.tmp").exists());
    }

    #[test]
    fn file_store_missing_key_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.get("nothing").unwrap(), None);
        store.delete("nothing").unwrap();
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new(temp_dir.path()).unwrap();
        assert!(matches!(
            store.put("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
    }
}
