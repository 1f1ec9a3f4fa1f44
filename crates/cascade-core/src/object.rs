//! Named value slots and their storage strategies.
//!
//! An [`Object`] is a named handle to a single value that may still be in
//! the never-stored state. The value itself lives behind an [`ObjectIo`]
//! strategy, so a slot can be process-local or a JSON file on disk without
//! the rest of the pipeline caring.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Context;

use crate::component::{Component, ComponentSet};
use crate::error::PipelineError;
use crate::Value;

/// Storage strategy for one named slot.
///
/// `load` reports `Ok(None)` while the slot has never been saved; a stored
/// `Value::Null` comes back as `Some(Value::Null)`, so "never stored" stays
/// distinguishable from a stored null.
pub trait ObjectIo: Send + Sync {
    /// Read the slot's current value, or `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns an error on underlying IO failure.
    fn load(&self) -> anyhow::Result<Option<Value>>;

    /// Overwrite the slot's value.
    ///
    /// # Errors
    ///
    /// Returns an error on underlying IO failure.
    fn save(&self, value: Value) -> anyhow::Result<()>;
}

/// Process-local slot storage.
#[derive(Debug, Default)]
pub struct MemoryIo {
    slot: RwLock<Option<Value>>,
}

impl MemoryIo {
    /// A slot in the never-stored state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-seeded with a value.
    #[must_use]
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            slot: RwLock::new(Some(value.into())),
        }
    }
}

impl ObjectIo for MemoryIo {
    fn load(&self) -> anyhow::Result<Option<Value>> {
        let guard = self
            .slot
            .read()
            .map_err(|_| anyhow::anyhow!("slot lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, value: Value) -> anyhow::Result<()> {
        let mut guard = self
            .slot
            .write()
            .map_err(|_| anyhow::anyhow!("slot lock poisoned"))?;
        *guard = Some(value);
        Ok(())
    }
}

/// One-file-per-slot JSON storage: the slot `name` lives at
/// `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileIo {
    path: PathBuf,
}

impl JsonFileIo {
    /// Slot file for `name` under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            path: dir.into().join(format!("{name}.json")),
        }
    }
}

impl ObjectIo for JsonFileIo {
    fn load(&self) -> anyhow::Result<Option<Value>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in {}", self.path.display()))?;
        Ok(Some(value))
    }

    fn save(&self, value: Value) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&value)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// A named value slot backed by an [`ObjectIo`] strategy.
///
/// The name is fixed at creation. Clones share the same underlying slot, so
/// a subset of an [`ObjectSet`] reads and writes the same values as the
/// original set.
#[derive(Clone)]
pub struct Object {
    name: String,
    io: Arc<dyn ObjectIo>,
}

impl Object {
    /// A slot named `name` backed by `io`.
    pub fn new(name: impl Into<String>, io: impl ObjectIo + 'static) -> Self {
        Self {
            name: name.into(),
            io: Arc::new(io),
        }
    }

    /// The slot's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the current value, or `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns an error on underlying IO failure.
    pub fn load(&self) -> anyhow::Result<Option<Value>> {
        self.io.load()
    }

    /// Overwrite the slot's value.
    ///
    /// # Errors
    ///
    /// Returns an error on underlying IO failure.
    pub fn save(&self, value: Value) -> anyhow::Result<()> {
        self.io.save(value)
    }

    /// Whether two handles point at the same underlying slot.
    #[must_use]
    pub fn same_slot(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.io, &other.io)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("name", &self.name).finish()
    }
}

impl Component for Object {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(candidates: &[Self]) -> Result<(), PipelineError> {
        let names = duplicate_names(candidates.iter().map(Object::name));
        if names.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::DuplicateObject { names })
        }
    }

    fn missing_error(names: Vec<String>) -> PipelineError {
        PipelineError::MissingObject { names }
    }
}

/// Registry of named value slots.
pub type ObjectSet = ComponentSet<Object>;

impl ObjectSet {
    /// Load every slot's value, in set order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Internal`] on slot IO failure.
    pub fn load_all(&self) -> Result<Vec<Option<Value>>, PipelineError> {
        self.values()
            .map(|obj| obj.load().map_err(PipelineError::internal))
            .collect()
    }

    /// Save one value per slot, in set order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CannotSave`] when the value count does not
    /// match the slot count, or [`PipelineError::Internal`] on IO failure.
    pub fn save_all(&self, values: Vec<Value>) -> Result<(), PipelineError> {
        if values.len() != self.len() {
            return Err(PipelineError::CannotSave {
                expected: self.len(),
                actual: values.len(),
            });
        }
        for (obj, value) in self.values().zip(values) {
            obj.save(value).map_err(PipelineError::internal)?;
        }
        Ok(())
    }
}

/// Names that occur more than once, in first-occurrence order.
pub(crate) fn duplicate_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut dupes: Vec<String> = Vec::new();
    for name in names {
        if !seen.insert(name) && !dupes.iter().any(|d| d == name) {
            dupes.push(name.to_string());
        }
    }
    dupes
}
