//! Resolve configuration into live collaborators.

use std::sync::Arc;

use anyhow::{bail, Result};

use cascade_state::{JsonFileStorage, MemoryStorage, Storage};

use crate::config::types::{PipelineConfig, StorageBackendKind};

/// Build the storage backend a configuration asks for.
///
/// # Errors
///
/// Returns an error when the `json` backend is selected without a location.
pub fn create_storage(config: &PipelineConfig) -> Result<Arc<dyn Storage>> {
    match config.storage.backend {
        StorageBackendKind::Memory => Ok(Arc::new(MemoryStorage::new()) as Arc<dyn Storage>),
        StorageBackendKind::Json => {
            let Some(location) = &config.storage.location else {
                bail!("Storage backend 'json' requires a location");
            };
            Ok(Arc::new(JsonFileStorage::new(location)) as Arc<dyn Storage>)
        }
    }
}
