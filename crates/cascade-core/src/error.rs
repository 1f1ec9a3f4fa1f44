//! Pipeline error taxonomy.
//!
//! Every failure in the pipeline family is a [`PipelineError`] kind. All of
//! them are terminal: structural validation happens before any stage runs,
//! and nothing in the engine retries.

/// Errors produced while building or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A lookup named one or more objects absent from the set.
    #[error("no such pipeline object(s) in set: {}", .names.join(", "))]
    MissingObject {
        /// Every requested name that was absent.
        names: Vec<String>,
    },

    /// A lookup named one or more stages absent from the set.
    #[error("no such pipeline stage(s) in set: {}", .names.join(", "))]
    MissingStage {
        /// Every requested name that was absent.
        names: Vec<String>,
    },

    /// Two or more objects in a candidate set share a name.
    #[error("pipeline object name(s) appear more than once: {}", .names.join(", "))]
    DuplicateObject {
        /// Every name that appeared more than once.
        names: Vec<String>,
    },

    /// Two or more stages in a candidate set share a name.
    #[error("pipeline stage name(s) appear more than once: {}", .names.join(", "))]
    DuplicateStage {
        /// Every name that appeared more than once.
        names: Vec<String>,
    },

    /// Two or more stages declare the same return name.
    #[error("object(s) returned by more than one stage: {}", .names.join(", "))]
    DuplicateReturn {
        /// Every return name claimed by more than one stage.
        names: Vec<String>,
    },

    /// A batched save supplied the wrong number of values for the slot set.
    #[error("cannot save {actual} value(s) to {expected} pipeline object(s)")]
    CannotSave { expected: usize, actual: usize },

    /// A stage declared a params list whose length does not match the
    /// wrapped function's arity.
    #[error("stage '{stage}': cannot rename {arity} function parameter(s) to {given} name(s)")]
    InvalidParams {
        stage: String,
        arity: usize,
        given: usize,
    },

    /// A stage's raw return value does not reconcile with its declared
    /// return arity.
    #[error("stage '{stage}' should return {expected} value(s) but returned {actual}")]
    InvalidResults {
        stage: String,
        expected: usize,
        actual: usize,
    },

    /// A stage was invoked with the wrong number of values, or against
    /// never-stored params.
    #[error("cannot call stage '{stage}': {reason}")]
    CannotCall { stage: String, reason: String },

    /// The dependency graph cannot be executed (cycle, or unused slots).
    #[error("cannot run pipeline: {reason}")]
    CannotRun { reason: String },

    /// A pipeline collaborator was read before being attached.
    #[error("pipeline '{pipeline}' has no {what} configured")]
    NotConfigured {
        pipeline: String,
        what: &'static str,
    },

    /// The user function inside a stage failed.
    #[error("stage '{stage}' failed")]
    Stage {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// Opaque host-side failure: storage backend, slot IO, or a panicked
    /// stage task.
    #[error("internal pipeline error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl PipelineError {
    /// Wrap an opaque host-side failure.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// Wrap a user-function failure with the owning stage's name.
    pub fn stage(name: impl Into<String>, err: impl Into<anyhow::Error>) -> Self {
        Self::Stage {
            stage: name.into(),
            source: err.into(),
        }
    }
}
