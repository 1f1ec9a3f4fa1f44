//! Semantic validation for parsed pipeline configuration values.

use anyhow::{bail, Result};

use crate::config::types::{PipelineConfig, StorageBackendKind};

/// Validate a parsed pipeline configuration.
/// Returns Ok(()) if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns one error listing every violation found.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.pipeline.trim().is_empty() {
        errors.push("Pipeline name must not be empty".to_string());
    }

    match config.storage.backend {
        StorageBackendKind::Json => {
            if config.storage.location.is_none() {
                errors.push("Storage backend 'json' requires a location".to_string());
            }
        }
        StorageBackendKind::Memory => {
            if config.storage.location.is_some() {
                errors.push("Storage backend 'memory' does not take a location".to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "));
    }
}
