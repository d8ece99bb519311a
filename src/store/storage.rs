//! Backing storage for whole-collection snapshots.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::StoreError;

/// Reads and writes a named collection as one JSON document
pub trait Storage: Send + Sync {
    /// Returns `None` when the collection has never been written
    fn read(&self, collection: &str) -> Result<Option<String>, StoreError>;

    fn write(&self, collection: &str, contents: &str) -> Result<(), StoreError>;
}

/// One `<collection>.json` file per collection inside a data directory
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }
}

impl Storage for JsonFileStorage {
    fn read(&self, collection: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(collection);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, collection: &str, contents: &str) -> Result<(), StoreError> {
        // Write-then-rename so a crash mid-write never truncates the collection
        let path = self.path_for(collection);
        let tmp = self.dir.join(format!(".{}.json.tmp", collection));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local storage, used by tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a collection document
    pub fn with_document(self, collection: &str, contents: impl Into<String>) -> Self {
        self.documents
            .lock()
            .insert(collection.to_string(), contents.into());
        self
    }

    pub fn document(&self, collection: &str) -> Option<String> {
        self.documents.lock().get(collection).cloned()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, collection: &str) -> Result<Option<String>, StoreError> {
        Ok(self.document(collection))
    }

    fn write(&self, collection: &str, contents: &str) -> Result<(), StoreError> {
        self.documents
            .lock()
            .insert(collection.to_string(), contents.to_string());
        Ok(())
    }
}
