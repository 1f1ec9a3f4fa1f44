//! Pipeline façade: a named stage registry plus its collaborators.

use std::sync::Arc;

use indexmap::IndexMap;

use cascade_core::{PipelineError, Stage, StageSet, Value};
use cascade_state::Storage;

use crate::runner::StageRunner;

/// A named computation pipeline.
///
/// Owns one stage registry, one storage handle, and one stage runner. The
/// collaborators can be attached after construction; reading one that was
/// never attached is a configuration error rather than a panic.
pub struct Pipeline {
    name: String,
    stages: StageSet,
    storage: Option<Arc<dyn Storage>>,
    runner: Option<Arc<dyn StageRunner>>,
}

impl Pipeline {
    /// An empty pipeline with no collaborators attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: StageSet::empty(),
            storage: None,
            runner: None,
        }
    }

    /// A pipeline seeded with an existing stage registry.
    pub fn with_stages(name: impl Into<String>, stages: StageSet) -> Self {
        Self {
            name: name.into(),
            stages,
            storage: None,
            runner: None,
        }
    }

    /// The pipeline's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered stages.
    #[must_use]
    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    /// Attach the storage backend.
    pub fn set_storage(&mut self, storage: Arc<dyn Storage>) {
        self.storage = Some(storage);
    }

    /// Attach the stage runner.
    pub fn set_runner(&mut self, runner: Arc<dyn StageRunner>) {
        self.runner = Some(runner);
    }

    /// Builder-style [`Pipeline::set_storage`].
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.set_storage(storage);
        self
    }

    /// Builder-style [`Pipeline::set_runner`].
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn StageRunner>) -> Self {
        self.set_runner(runner);
        self
    }

    /// The attached storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] if no storage was attached.
    pub fn storage(&self) -> Result<&Arc<dyn Storage>, PipelineError> {
        self.storage.as_ref().ok_or(PipelineError::NotConfigured {
            pipeline: self.name.clone(),
            what: "storage",
        })
    }

    /// The attached stage runner.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] if no runner was attached.
    pub fn runner(&self) -> Result<&Arc<dyn StageRunner>, PipelineError> {
        self.runner.as_ref().ok_or(PipelineError::NotConfigured {
            pipeline: self.name.clone(),
            what: "stage runner",
        })
    }

    /// Register one stage.
    ///
    /// # Errors
    ///
    /// Returns the same duplicate errors as direct [`StageSet`]
    /// construction when the new stage collides with a registered one.
    pub fn register(&mut self, stage: Stage) -> Result<(), PipelineError> {
        self.stages = self.stages.with(stage)?;
        Ok(())
    }

    /// Register several stages at once.
    ///
    /// # Errors
    ///
    /// Returns the same duplicate errors as direct [`StageSet`] construction.
    pub fn add_stages(&mut self, stages: impl IntoIterator<Item = Stage>) -> Result<(), PipelineError> {
        self.stages = self.stages.add(stages)?;
        Ok(())
    }

    /// Execute every registered stage in dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] when storage or runner is
    /// missing, a [`PipelineError::CannotRun`] from pre-flight validation,
    /// or the first failing stage's error.
    pub async fn run(&self) -> Result<(), PipelineError> {
        let storage = Arc::clone(self.storage()?);
        let runner = Arc::clone(self.runner()?);
        tracing::info!(
            pipeline = %self.name,
            stages = self.stages.len(),
            "Starting pipeline run"
        );
        runner.run(&self.stages, &storage).await
    }

    /// Seed values into storage before a run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] when storage is missing, or
    /// [`PipelineError::Internal`] on backend failure.
    pub fn set_values<N, V>(
        &self,
        entries: impl IntoIterator<Item = (N, V)>,
    ) -> Result<(), PipelineError>
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self.storage()?
            .store_many(entries)
            .map_err(PipelineError::internal)
    }

    /// Read values back from storage, keyed by name.
    ///
    /// With an empty `names`, reads every name the backend knows. A name in
    /// the never-stored state maps to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] when storage is missing, or
    /// [`PipelineError::Internal`] on backend failure.
    pub fn get_values(
        &self,
        names: &[String],
    ) -> Result<IndexMap<String, Option<Value>>, PipelineError> {
        let storage = self.storage()?;
        let names: Vec<String> = if names.is_empty() {
            storage.list_names().map_err(PipelineError::internal)?
        } else {
            names.to_vec()
        };
        let values = storage
            .fetch_many(&names)
            .map_err(PipelineError::internal)?;
        Ok(names.into_iter().zip(values).collect())
    }
}
