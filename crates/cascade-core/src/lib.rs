//! Core data model for cascade pipelines.
//!
//! A pipeline is a set of named [`Stage`]s, each consuming and producing
//! named JSON values. This crate holds the pieces with no execution policy
//! attached: the validated component registry, the named value slots, the
//! stage invocation contract, and the shared error taxonomy. Scheduling and
//! storage live in the `cascade-engine` and `cascade-state` crates.

#![warn(clippy::pedantic)]

pub mod component;
pub mod error;
pub mod object;
pub mod stage;

/// The value type flowing between stages and storage.
pub type Value = serde_json::Value;

pub use component::{Component, ComponentSet};
pub use error::PipelineError;
pub use object::{JsonFileIo, MemoryIo, Object, ObjectIo, ObjectSet};
pub use stage::{Stage, StageFn, StageOutput, StageSet};
