//! The evaluation context: scores one candidate per call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hs_types::{EvalError, InnerParallelism, ParamMap};

use crate::measure::Measure;
use crate::model::{FitReport, ModelSpec};
use crate::resample::ResamplePlan;
use crate::EvalResult;

/// What one evaluation produces: the measure names, the fold-aggregated
/// values, and the per-fold breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub measures: Vec<String>,
    pub aggregated: Vec<f64>,
    pub per_fold: Vec<Vec<f64>>,
}

/// Scores one candidate configuration against fixed resampling data.
///
/// `evaluate` mutates the receiver (the active configuration is swapped per
/// candidate), so an evaluator must never be shared across concurrent
/// workers — the scheduler clones one per thread and ships serialized copies
/// to worker processes, hence the `Clone + Serialize + DeserializeOwned`
/// bounds.
pub trait Evaluator: Clone + Send + Serialize + DeserializeOwned + 'static {
    fn evaluate(&mut self, params: &ParamMap) -> EvalResult<EvalOutcome>;

    /// Retrain a configuration on the complete dataset.
    fn refit(&self, params: &ParamMap) -> EvalResult<FitReport>;

    fn measures(&self) -> &[Measure];

    fn inner(&self) -> InnerParallelism;

    fn set_inner(&mut self, inner: InnerParallelism);
}

/// Concrete evaluation context: base configuration + resampling plan +
/// measures + a model specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "M: ModelSpec")]
pub struct EvalContext<M: ModelSpec> {
    base: ParamMap,
    /// The configuration currently under evaluation; overwritten per call.
    active: ParamMap,
    plan: ResamplePlan,
    measures: Vec<Measure>,
    n_rows: usize,
    inner: InnerParallelism,
    model: M,
}

impl<M: ModelSpec> EvalContext<M> {
    pub fn new(
        base: ParamMap,
        plan: ResamplePlan,
        measures: Vec<Measure>,
        n_rows: usize,
        model: M,
    ) -> Self {
        Self {
            active: base.clone(),
            base,
            plan,
            measures,
            n_rows,
            inner: InnerParallelism::Sequential,
            model,
        }
    }

    pub fn with_inner(mut self, inner: InnerParallelism) -> Self {
        self.inner = inner;
        self
    }

    /// The configuration most recently evaluated.
    pub fn active(&self) -> &ParamMap {
        &self.active
    }

    pub fn plan(&self) -> &ResamplePlan {
        &self.plan
    }

    /// Base configuration overridden by the candidate's values.
    fn merged(&self, params: &ParamMap) -> ParamMap {
        let mut merged = self.base.clone();
        for (name, value) in params {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    fn score_folds(&self) -> EvalResult<Vec<Vec<f64>>> {
        let splits = self.plan.splits(self.n_rows)?;

        let workers = match self.inner {
            InnerParallelism::Sequential => 1,
            InnerParallelism::Threads { workers } => workers.min(splits.len()),
        };

        if workers <= 1 {
            return splits
                .iter()
                .map(|split| self.model.fold_scores(&self.active, split, &self.measures))
                .collect();
        }

        // One cloned model per worker; chunk results joined in chunk order so
        // the fold order matches the sequential path.
        let chunk_size = (splits.len() + workers - 1) / workers;
        let active = &self.active;
        let measures = &self.measures;
        std::thread::scope(|scope| {
            let handles: Vec<_> = splits
                .chunks(chunk_size)
                .map(|chunk| {
                    let model = self.model.clone();
                    scope.spawn(move || -> EvalResult<Vec<Vec<f64>>> {
                        chunk
                            .iter()
                            .map(|split| model.fold_scores(active, split, measures))
                            .collect()
                    })
                })
                .collect();

            let mut per_fold = Vec::with_capacity(splits.len());
            for handle in handles {
                let chunk_scores = handle.join().map_err(|_| EvalError::Fit {
                    message: "fold worker panicked".to_string(),
                })??;
                per_fold.extend(chunk_scores);
            }
            Ok(per_fold)
        })
    }
}

impl<M: ModelSpec> Evaluator for EvalContext<M> {
    fn evaluate(&mut self, params: &ParamMap) -> EvalResult<EvalOutcome> {
        self.active = self.merged(params);
        debug!(folds = self.plan.fold_count(), "evaluating candidate");

        let per_fold = self.score_folds()?;

        let folds = per_fold.len().max(1) as f64;
        let mut aggregated = vec![0.0; self.measures.len()];
        for fold_scores in &per_fold {
            for (i, score) in fold_scores.iter().enumerate() {
                aggregated[i] += score / folds;
            }
        }

        Ok(EvalOutcome {
            measures: self.measures.iter().map(|m| m.name.clone()).collect(),
            aggregated,
            per_fold,
        })
    }

    fn refit(&self, params: &ParamMap) -> EvalResult<FitReport> {
        self.model.refit(&self.merged(params), self.n_rows)
    }

    fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn inner(&self) -> InnerParallelism {
        self.inner
    }

    fn set_inner(&mut self, inner: InnerParallelism) {
        self.inner = inner;
    }
}
