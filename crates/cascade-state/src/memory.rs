//! In-memory storage backend.

use std::collections::BTreeMap;
use std::sync::RwLock;

use cascade_core::Value;

use crate::backend::Storage;
use crate::error::{self, StorageError};

/// Process-local value map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStorage {
    /// An empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn fetch_one(&self, name: &str) -> error::Result<Option<Value>> {
        let values = self.values.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(values.get(name).cloned())
    }

    fn fetch_many(&self, names: &[String]) -> error::Result<Vec<Option<Value>>> {
        let values = self.values.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(names.iter().map(|name| values.get(name).cloned()).collect())
    }

    fn store_one(&self, name: &str, value: Value) -> error::Result<()> {
        let mut values = self.values.write().map_err(|_| StorageError::LockPoisoned)?;
        values.insert(name.to_string(), value);
        Ok(())
    }

    fn store_many(&self, entries: Vec<(String, Value)>) -> error::Result<()> {
        let mut values = self.values.write().map_err(|_| StorageError::LockPoisoned)?;
        values.extend(entries);
        Ok(())
    }

    fn list_names(&self) -> error::Result<Vec<String>> {
        let values = self.values.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(values.keys().cloned().collect())
    }
}
