use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{SlotStore, StoreError};

/// Slots persisted as a single JSON object on disk.
///
/// The file is re-read on every access so that a value written by an earlier
/// run (or cleared by hand) is always what the next read sees. Writes go to a
/// sibling temp file first and are renamed into place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(slots)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl SlotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("FileStore lock poisoned");
        // A corrupt file is replaced rather than blocking every future write.
        let mut slots = match self.load() {
            Ok(slots) => slots,
            Err(StoreError::Corrupt(reason)) => {
                log::warn!("Discarding corrupt slot file ({})", reason);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        slots.insert(key.to_string(), value.to_string());
        self.persist(&slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let store = FileStore::new(dir.path().join("slots.json"));
        assert!(store.get("uid").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_a_new_handle() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let path = dir.path().join("nested").join("slots.json");

        FileStore::new(&path).set("uid", "1234").unwrap();
        FileStore::new(&path).set("refererName", "https://ads.example/").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("uid").unwrap().as_deref(), Some("1234"));
        assert_eq!(
            reopened.get("refererName").unwrap().as_deref(),
            Some("https://ads.example/")
        );
    }

    #[test]
    fn test_corrupt_file_errors_on_read_and_is_replaced_on_write() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let path = dir.path().join("slots.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("uid"), Err(StoreError::Corrupt(_))));

        store.set("uid", "fresh").unwrap();
        assert_eq!(store.get("uid").unwrap().as_deref(), Some("fresh"));
    }
}
