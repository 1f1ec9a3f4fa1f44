//! Object-registry storage backend.
//!
//! Adapts a fixed [`ObjectSet`] to the [`Storage`] trait. Unlike the map
//! and file backends, the set of legal names is closed at construction:
//! every slot is declared up front, `list_names` reports all of them
//! whether stored or not, and addressing an undeclared name is an error.

use cascade_core::{ObjectSet, Value};

use crate::backend::Storage;
use crate::error::{self, StorageError};

/// Storage over a closed registry of pre-declared slots.
pub struct ObjectStorage {
    objects: ObjectSet,
}

impl ObjectStorage {
    /// Backend over the given slot registry.
    #[must_use]
    pub fn new(objects: ObjectSet) -> Self {
        Self { objects }
    }

    /// The underlying slot registry.
    #[must_use]
    pub fn objects(&self) -> &ObjectSet {
        &self.objects
    }
}

impl Storage for ObjectStorage {
    fn fetch_one(&self, name: &str) -> error::Result<Option<Value>> {
        let object = self
            .objects
            .get(name)
            .map_err(|_| StorageError::UnknownSlot(name.to_string()))?;
        object.load().map_err(StorageError::Slot)
    }

    fn store_one(&self, name: &str, value: Value) -> error::Result<()> {
        let object = self
            .objects
            .get(name)
            .map_err(|_| StorageError::UnknownSlot(name.to_string()))?;
        object.save(value).map_err(StorageError::Slot)
    }

    fn list_names(&self) -> error::Result<Vec<String>> {
        let mut names: Vec<String> = self.objects.keys().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }
}
