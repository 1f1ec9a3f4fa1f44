//! JSON-file storage backend: one `<name>.json` file per value.

use std::path::{Path, PathBuf};

use cascade_core::Value;

use crate::backend::Storage;
use crate::error;

/// Directory-backed storage where the value `name` lives at
/// `<location>/<name>.json`.
///
/// The directory is created on first store, not at construction, so a
/// backend can be configured before the path exists.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    location: PathBuf,
}

impl JsonFileStorage {
    /// Backend rooted at `location`.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// The configured directory.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    fn value_path(&self, name: &str) -> PathBuf {
        self.location.join(format!("{name}.json"))
    }
}

impl Storage for JsonFileStorage {
    fn fetch_one(&self, name: &str) -> error::Result<Option<Value>> {
        let raw = match std::fs::read_to_string(self.value_path(name)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn store_one(&self, name: &str, value: Value) -> error::Result<()> {
        std::fs::create_dir_all(&self.location)?;
        let raw = serde_json::to_string_pretty(&value)?;
        std::fs::write(self.value_path(name), raw)?;
        Ok(())
    }

    fn list_names(&self) -> error::Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.location) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
