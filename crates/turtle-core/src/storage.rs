//! Durable byte storage for the persisted records.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::StorageError;

/// Named blobs. Writes must be atomic: a reader sees either the old bytes or
/// the new bytes, never a torn record.
pub trait Storage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Removing a missing record is not an error.
    fn remove(&mut self, name: &str) -> Result<(), StorageError>;

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.read(name)?.is_some())
    }
}

pub fn load_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    name: &str,
) -> Result<Option<T>, StorageError> {
    match storage.read(name)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(
    storage: &mut dyn Storage,
    name: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    storage.write(name, &bytes)
}

/// One file per record under a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            name: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn io_err(name: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        name: name.to_string(),
        source,
    }
}

impl Storage for FileStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(name)(e)),
        }
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let tmp = self.path(&format!("{name}.tmp"));
        fs::write(&tmp, bytes).map_err(io_err(name))?;
        fs::rename(&tmp, self.path(name)).map_err(io_err(name))
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(name)(e)),
        }
    }
}

/// In-memory storage. Clones share the same records, so a test can drop a
/// tracker mid-operation and start a new one against the same "disk".
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.borrow().keys().cloned().collect()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.records.borrow().get(name).cloned())
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.records
            .borrow_mut()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        self.records.borrow_mut().remove(name);
        Ok(())
    }
}
