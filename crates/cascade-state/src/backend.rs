//! Storage trait definition.
//!
//! [`Storage`] defines the contract between the stage runner and whatever
//! holds the pipeline's named values. Implementations must be `Send + Sync`
//! for use behind `Arc<dyn Storage>`.

use cascade_core::Value;

use crate::error;

/// Mapping from value name to current value.
///
/// A fetch reporting `Ok(None)` means the name has never been stored; a
/// stored `Value::Null` comes back as `Some(Value::Null)`. The batched
/// methods have element-wise defaults; backends override them when they can
/// do better under one lock.
pub trait Storage: Send + Sync {
    /// Read one value by name, or `None` if never stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`](crate::StorageError) on backend failure.
    fn fetch_one(&self, name: &str) -> error::Result<Option<Value>>;

    /// Read several values, ordered to match `names`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`](crate::StorageError) on backend failure.
    fn fetch_many(&self, names: &[String]) -> error::Result<Vec<Option<Value>>> {
        names.iter().map(|name| self.fetch_one(name)).collect()
    }

    /// Store one value under `name`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`](crate::StorageError) on backend failure.
    fn store_one(&self, name: &str, value: Value) -> error::Result<()>;

    /// Store several `(name, value)` entries.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`](crate::StorageError) on backend failure.
    fn store_many(&self, entries: Vec<(String, Value)>) -> error::Result<()> {
        for (name, value) in entries {
            self.store_one(&name, value)?;
        }
        Ok(())
    }

    /// Every name the backend knows, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`](crate::StorageError) on backend failure.
    fn list_names(&self) -> error::Result<Vec<String>>;
}
