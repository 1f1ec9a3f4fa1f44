//! Pipeline stages: named functions with declared input and output names.
//!
//! A [`Stage`] wraps a function together with the names of the values it
//! consumes (`params`) and produces (`returns`). Invocation goes through
//! [`Stage::call`], which binds positional values to params and reconciles
//! the function's raw result against the declared return arity.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::component::{Component, ComponentSet};
use crate::error::PipelineError;
use crate::object::duplicate_names;
use crate::Value;

/// Raw result of a stage function, tagged by shape.
///
/// The tag drives return reconciliation: only `Tuple` is ever unpacked
/// across multiple declared returns. A `Single` holding a `Value::Array`
/// stays one value, which is what lets a stage return a sequence *as data*.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// The function produced nothing.
    Void,
    /// One value, stored under a single declared return name.
    Single(Value),
    /// A fixed-size ordered group, eligible for element-wise unpacking.
    Tuple(Vec<Value>),
}

impl From<Value> for StageOutput {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

impl From<()> for StageOutput {
    fn from((): ()) -> Self {
        Self::Void
    }
}

impl From<Vec<Value>> for StageOutput {
    fn from(values: Vec<Value>) -> Self {
        Self::Tuple(values)
    }
}

/// A stage's function together with its formal arity.
///
/// The function receives its arguments positionally, in declared-param
/// order, and reports failures as opaque errors that the engine wraps with
/// the owning stage's name.
#[derive(Clone)]
pub struct StageFn {
    arity: usize,
    inner: Arc<dyn Fn(Vec<Value>) -> anyhow::Result<StageOutput> + Send + Sync>,
}

impl StageFn {
    /// Wrap a function taking `arity` positional values.
    pub fn new<F>(arity: usize, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<StageOutput> + Send + Sync + 'static,
    {
        Self {
            arity,
            inner: Arc::new(f),
        }
    }

    /// Number of positional values the function takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&self, args: Vec<Value>) -> anyhow::Result<StageOutput> {
        (self.inner)(args)
    }
}

impl fmt::Debug for StageFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageFn").field("arity", &self.arity).finish()
    }
}

/// A named unit of computation: function + declared params + declared returns.
///
/// Immutable after construction; clones share the underlying function.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    func: StageFn,
    params: Vec<String>,
    returns: Vec<String>,
}

impl Stage {
    /// Build a stage.
    ///
    /// `params` names the function's positional arguments in order (the
    /// names may differ from anything the function knows about, but the
    /// count must match its arity exactly). `returns` may have any length,
    /// including zero; its length is the contract every invocation must
    /// satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParams`] when `params` does not
    /// match the function's arity.
    pub fn new<P, R>(
        name: impl Into<String>,
        func: StageFn,
        params: P,
        returns: R,
    ) -> Result<Self, PipelineError>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let name = name.into();
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        let returns: Vec<String> = returns.into_iter().map(Into::into).collect();
        if params.len() != func.arity() {
            return Err(PipelineError::InvalidParams {
                stage: name,
                arity: func.arity(),
                given: params.len(),
            });
        }
        Ok(Self {
            name,
            func,
            params,
            returns,
        })
    }

    /// The stage's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input names, in positional order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Output names, in positional order.
    #[must_use]
    pub fn returns(&self) -> &[String] {
        &self.returns
    }

    /// A handle to the wrapped function, usable outside the pipeline.
    #[must_use]
    pub fn func(&self) -> &StageFn {
        &self.func
    }

    /// Invoke the stage with one value per declared param, in param order.
    ///
    /// Returns exactly one value per declared return name, in return order.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::CannotCall`] when the value count does not match
    ///   the declared params.
    /// - [`PipelineError::Stage`] when the wrapped function fails.
    /// - [`PipelineError::InvalidResults`] when the raw result's shape does
    ///   not reconcile with the declared return arity.
    pub fn call(&self, values: Vec<Value>) -> Result<Vec<Value>, PipelineError> {
        if values.len() != self.params.len() {
            return Err(PipelineError::CannotCall {
                stage: self.name.clone(),
                reason: format!(
                    "expected {} param value(s) but was given {}",
                    self.params.len(),
                    values.len()
                ),
            });
        }
        let raw = self
            .func
            .invoke(values)
            .map_err(|source| PipelineError::stage(self.name.as_str(), source))?;
        self.reconcile(raw)
    }

    /// Normalize a raw result against the declared return arity.
    fn reconcile(&self, raw: StageOutput) -> Result<Vec<Value>, PipelineError> {
        let expected = self.returns.len();
        let invalid = |actual: usize| PipelineError::InvalidResults {
            stage: self.name.clone(),
            expected,
            actual,
        };
        match raw {
            StageOutput::Void => match expected {
                0 => Ok(Vec::new()),
                1 => Ok(vec![Value::Null]),
                _ => Err(invalid(0)),
            },
            // A single value, array or not, is never unpacked.
            StageOutput::Single(value) => {
                if expected == 1 {
                    Ok(vec![value])
                } else {
                    Err(invalid(1))
                }
            }
            // One declared return takes the whole group as a single value;
            // otherwise the group must unpack element-wise.
            StageOutput::Tuple(values) => {
                if expected == 1 {
                    Ok(vec![Value::Array(values)])
                } else if expected == values.len() {
                    Ok(values)
                } else {
                    Err(invalid(values.len()))
                }
            }
        }
    }
}

impl Component for Stage {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(candidates: &[Self]) -> Result<(), PipelineError> {
        let names = duplicate_names(candidates.iter().map(Stage::name));
        if !names.is_empty() {
            return Err(PipelineError::DuplicateStage { names });
        }
        let returns = duplicate_names(
            candidates
                .iter()
                .flat_map(|s| s.returns.iter().map(String::as_str)),
        );
        if !returns.is_empty() {
            return Err(PipelineError::DuplicateReturn { names: returns });
        }
        Ok(())
    }

    fn missing_error(names: Vec<String>) -> PipelineError {
        PipelineError::MissingStage { names }
    }
}

/// Registry of stages.
///
/// Beyond name uniqueness, validation guarantees that every declared return
/// name is produced by at most one stage, which is what makes the producer
/// lookup in [`StageSet::producers`] well-defined.
pub type StageSet = ComponentSet<Stage>;

impl StageSet {
    /// Every declared return name mapped to its producing stage.
    #[must_use]
    pub fn producers(&self) -> IndexMap<&str, &Stage> {
        let mut map = IndexMap::new();
        for stage in self.values() {
            for ret in &stage.returns {
                map.insert(ret.as_str(), stage);
            }
        }
        map
    }

    /// Every declared param name mapped to the stages that consume it.
    #[must_use]
    pub fn consumers(&self) -> IndexMap<&str, Vec<&Stage>> {
        let mut map: IndexMap<&str, Vec<&Stage>> = IndexMap::new();
        for stage in self.values() {
            for param in &stage.params {
                map.entry(param.as_str()).or_default().push(stage);
            }
        }
        map
    }
}
