//! Dependency-graph stage runner.
//!
//! [`DagStageRunner`] derives the producer graph from the stages' declared
//! params and returns, validates it up front (cycles, unused slots), and
//! then executes the stages level by level: every stage whose predecessors
//! have committed their outputs runs in the current batch, the whole batch
//! joins, and only then does the next batch start. Within a batch each
//! stage writes only its own declared returns, so batch members never race
//! on storage.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::task::JoinSet;

use cascade_core::{PipelineError, Stage, StageSet, Value};
use cascade_state::Storage;

/// Executes a stage set against a storage handle.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Run every stage once, in an order consistent with data dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CannotRun`] from pre-flight validation
    /// (before any stage executes), or the failing stage's error once
    /// execution has started. A mid-run failure leaves storage holding the
    /// outputs of every batch that completed before it; there is no
    /// rollback.
    async fn run(
        &self,
        stages: &StageSet,
        storage: &Arc<dyn Storage>,
    ) -> Result<(), PipelineError>;
}

/// Level-synchronous scheduler over the stage dependency graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagStageRunner;

impl DagStageRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageRunner for DagStageRunner {
    async fn run(
        &self,
        stages: &StageSet,
        storage: &Arc<dyn Storage>,
    ) -> Result<(), PipelineError> {
        let batches = plan_batches(stages)?;
        check_all_values_used(stages, storage.as_ref())?;
        tracing::info!(
            stages = stages.len(),
            batches = batches.len(),
            "Starting stage execution"
        );

        for (index, batch) in batches.iter().enumerate() {
            tracing::debug!(batch = index, stages = ?batch, "Executing ready batch");
            let mut join_set: JoinSet<Result<(), PipelineError>> = JoinSet::new();
            for name in batch {
                let stage = stages.get(name)?.clone();
                let storage = Arc::clone(storage);
                join_set.spawn_blocking(move || execute_stage(&stage, storage.as_ref()));
            }

            let mut first_error: Option<PipelineError> = None;
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        tracing::error!("Stage failed: {error}");
                        if first_error.is_none() {
                            first_error = Some(error);
                            join_set.abort_all();
                        }
                    }
                    Err(join_err) if join_err.is_cancelled() && first_error.is_some() => {
                        // Siblings cancelled after the first failure in the batch.
                    }
                    Err(join_err) => {
                        return Err(PipelineError::internal(anyhow::anyhow!(
                            "stage task panicked: {join_err}"
                        )));
                    }
                }
            }
            if let Some(error) = first_error {
                return Err(error);
            }
        }
        Ok(())
    }
}

/// Group stages into executable batches via Kahn's algorithm.
///
/// A stage's predecessors are the stages producing its declared params;
/// params with no producer are externally supplied leaves. Batch `n + 1`
/// holds exactly the stages whose last predecessor sits in batch `n`.
///
/// # Errors
///
/// Returns [`PipelineError::CannotRun`] naming the stages left on a cycle
/// when the graph has one.
pub fn plan_batches(stages: &StageSet) -> Result<Vec<Vec<String>>, PipelineError> {
    let producers: IndexMap<&str, &str> = stages
        .producers()
        .into_iter()
        .map(|(ret, stage)| (ret, stage.name()))
        .collect();

    let mut indegree: IndexMap<&str, usize> = stages.keys().map(|name| (name, 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, stage) in stages.iter() {
        let preds: BTreeSet<&str> = stage
            .params()
            .iter()
            .filter_map(|param| producers.get(param.as_str()).copied())
            .collect();
        for pred in preds {
            *indegree.get_mut(name).expect("stage name is present") += 1;
            dependents.entry(pred).or_default().push(name);
        }
    }

    let mut ready: Vec<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut done = 0;

    while !ready.is_empty() {
        done += ready.len();
        let mut next = Vec::new();
        for name in &ready {
            for dependent in dependents.get(name).into_iter().flatten() {
                let degree = indegree
                    .get_mut(dependent)
                    .expect("dependent is a known stage");
                *degree -= 1;
                if *degree == 0 {
                    next.push(*dependent);
                }
            }
        }
        batches.push(ready.iter().map(|name| (*name).to_string()).collect());
        ready = next;
    }

    if done < stages.len() {
        let stuck: Vec<&str> = indegree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| *name)
            .collect();
        return Err(PipelineError::CannotRun {
            reason: format!(
                "cycle detected in the stage dependency graph involving stage(s): {}",
                stuck.join(", ")
            ),
        });
    }
    Ok(batches)
}

/// Fail if storage knows a name no stage consumes or produces.
fn check_all_values_used(stages: &StageSet, storage: &dyn Storage) -> Result<(), PipelineError> {
    let used: HashSet<&str> = stages
        .values()
        .flat_map(|stage| {
            stage
                .params()
                .iter()
                .chain(stage.returns().iter())
                .map(String::as_str)
        })
        .collect();
    let unused: Vec<String> = storage
        .list_names()
        .map_err(PipelineError::internal)?
        .into_iter()
        .filter(|name| !used.contains(name.as_str()))
        .collect();
    if unused.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::CannotRun {
            reason: format!(
                "object(s) not used as a param or return of any stage: {}",
                unused.join(", ")
            ),
        })
    }
}

/// Fetch one stage's params, invoke it, and store its returns.
fn execute_stage(stage: &Stage, storage: &dyn Storage) -> Result<(), PipelineError> {
    let fetched = storage
        .fetch_many(stage.params())
        .map_err(PipelineError::internal)?;

    let mut values = Vec::with_capacity(fetched.len());
    let mut valueless = Vec::new();
    for (param, value) in stage.params().iter().zip(fetched) {
        match value {
            Some(value) => values.push(value),
            None => valueless.push(param.clone()),
        }
    }
    if !valueless.is_empty() {
        return Err(PipelineError::CannotCall {
            stage: stage.name().to_string(),
            reason: format!("valueless param(s): {}", valueless.join(", ")),
        });
    }

    let results = stage.call(values)?;
    let entries: Vec<(String, Value)> = stage.returns().iter().cloned().zip(results).collect();
    storage
        .store_many(entries)
        .map_err(PipelineError::internal)?;
    tracing::debug!(stage = stage.name(), "Stage completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::{StageFn, StageOutput};
    use cascade_state::MemoryStorage;
    use serde_json::json;

    fn noop_stage(name: &str, params: &[&str], returns: &[&str]) -> Stage {
        let returns_len = returns.len();
        let func = StageFn::new(params.len(), move |_| {
            Ok(StageOutput::Tuple(vec![Value::Null; returns_len]))
        });
        Stage::new(name, func, params.iter().copied(), returns.iter().copied()).unwrap()
    }

    #[test]
    fn plan_orders_a_chain_regardless_of_registration_order() {
        // C consumes y, B turns x into y, A produces x; registered backwards.
        let set = StageSet::new([
            noop_stage("c", &["y"], &["z"]),
            noop_stage("b", &["x"], &["y"]),
            noop_stage("a", &[], &["x"]),
        ])
        .unwrap();
        let batches = plan_batches(&set).unwrap();
        assert_eq!(batches, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn plan_groups_independent_stages_into_one_batch() {
        let set = StageSet::new([
            noop_stage("square", &["num1"], &["num3"]),
            noop_stage("cube", &["num2"], &["num4"]),
            noop_stage("add", &["num3", "num4"], &["num5"]),
        ])
        .unwrap();
        let batches = plan_batches(&set).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec!["square", "cube"]);
        assert_eq!(batches[1], vec!["add"]);
    }

    #[test]
    fn plan_rejects_a_two_stage_cycle() {
        // Each stage needs the value the other produces.
        let set = StageSet::new([
            noop_stage("a", &["num1"], &["num2"]),
            noop_stage("b", &["num2"], &["num1"]),
        ])
        .unwrap();
        let err = plan_batches(&set).unwrap_err();
        match err {
            PipelineError::CannotRun { reason } => {
                assert!(reason.contains("cycle"), "got: {reason}");
                assert!(reason.contains('a') && reason.contains('b'));
            }
            other => panic!("expected CannotRun, got {other}"),
        }
    }

    #[test]
    fn plan_rejects_a_self_loop() {
        let set = StageSet::new([noop_stage("echo", &["x"], &["x"])]).unwrap();
        let err = plan_batches(&set).unwrap_err();
        assert!(matches!(err, PipelineError::CannotRun { .. }));
    }

    #[test]
    fn unused_stored_names_fail_preflight() {
        let set = StageSet::new([noop_stage("a", &["num1"], &["num2"])]).unwrap();
        let storage = MemoryStorage::new();
        storage.store_one("num1", json!(1)).unwrap();
        storage.store_one("num5", json!(5)).unwrap();
        let err = check_all_values_used(&set, &storage).unwrap_err();
        match err {
            PipelineError::CannotRun { reason } => {
                assert!(reason.contains("num5"), "got: {reason}");
                assert!(!reason.contains("num1"));
            }
            other => panic!("expected CannotRun, got {other}"),
        }
    }

    #[test]
    fn execute_stage_reports_valueless_params() {
        let stage = noop_stage("needs_both", &["num1", "num2"], &[]);
        let storage = MemoryStorage::new();
        storage.store_one("num1", json!(1)).unwrap();
        let err = execute_stage(&stage, &storage).unwrap_err();
        match err {
            PipelineError::CannotCall { stage, reason } => {
                assert_eq!(stage, "needs_both");
                assert!(reason.contains("num2") && !reason.contains("num1"));
            }
            other => panic!("expected CannotCall, got {other}"),
        }
    }

    #[test]
    fn execute_stage_stores_returns_under_declared_names() {
        let func = StageFn::new(1, |mut args| {
            let n = args.remove(0).as_i64().expect("int param");
            Ok(StageOutput::Tuple(vec![json!(n + 1), json!(n * 2)]))
        });
        let stage = Stage::new("fan_out", func, ["n"], ["incremented", "doubled"]).unwrap();
        let storage = MemoryStorage::new();
        storage.store_one("n", json!(10)).unwrap();
        execute_stage(&stage, &storage).unwrap();
        assert_eq!(storage.fetch_one("incremented").unwrap(), Some(json!(11)));
        assert_eq!(storage.fetch_one("doubled").unwrap(), Some(json!(20)));
    }
}
