//! Sweep configuration.

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, InnerParallelism};
use crate::errors::{ConfigError, SweepResult};
use crate::params::{ParamKind, ParamMap, ParamSpace};

/// Top-level configuration for a sweep.
///
/// A snapshot of this struct is persisted with the meta-state; resuming a
/// search compares the new configuration against the snapshot with
/// [`SweepConfig::same_except_budget`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub name: String,

    /// The generation range candidates are drawn from.
    pub space: ParamSpace,

    /// Name of the search strategy (e.g. "grid", "random"); part of the
    /// resume equality check.
    pub strategy: String,

    /// Evaluation budget: maximum number of history entries this sweep may
    /// produce. 0 means "use the strategy's default budget".
    pub budget: usize,

    /// Outer scheduling backend for candidate batches.
    pub backend: Backend,

    /// Fold-level parallelism inside one evaluation.
    pub inner: InnerParallelism,

    /// Name of the selection rule used at finalization.
    pub heuristic: String,

    /// Whether the finalizer retrains the best configuration on the full
    /// data. When false the refit report is absent.
    pub refit: bool,

    /// Gates progress emission.
    pub verbose: bool,

    /// Base configuration the sampled parameters override.
    pub base: ParamMap,
}

impl SweepConfig {
    pub fn new(name: impl Into<String>, space: ParamSpace, strategy: &str) -> Self {
        Self {
            name: name.into(),
            space,
            strategy: strategy.to_string(),
            budget: 0,
            backend: Backend::Sequential,
            inner: InnerParallelism::Sequential,
            heuristic: "best_by_measure".to_string(),
            refit: true,
            verbose: false,
            base: ParamMap::new(),
        }
    }

    pub fn with_budget(mut self, n: usize) -> Self {
        self.budget = n;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_inner(mut self, inner: InnerParallelism) -> Self {
        self.inner = inner;
        self
    }

    pub fn with_heuristic(mut self, name: &str) -> Self {
        self.heuristic = name.to_string();
        self
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_base(mut self, base: ParamMap) -> Self {
        self.base = base;
        self
    }

    /// Eager validation, surfaced at construction time rather than search
    /// time.
    pub fn validate(&self) -> SweepResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        if self.space.is_empty() {
            return Err(ConfigError::EmptySpace.into());
        }
        for def in &self.space.parameters {
            let (low, high) = match &def.kind {
                ParamKind::FloatRange { low, high } | ParamKind::LogUniform { low, high } => {
                    (*low, *high)
                }
                ParamKind::IntRange { low, high } => (*low as f64, *high as f64),
                ParamKind::Choice { values } => {
                    if values.is_empty() {
                        return Err(ConfigError::EmptyChoice {
                            name: def.name.clone(),
                        }
                        .into());
                    }
                    continue;
                }
            };
            if low >= high {
                return Err(ConfigError::InvalidBound {
                    name: def.name.clone(),
                    low,
                    high,
                }
                .into());
            }
        }
        let workers = match &self.backend {
            Backend::Sequential => 1,
            Backend::Threads { workers } => *workers,
            Backend::Processes { workers, .. } => *workers,
        };
        if workers == 0 {
            return Err(ConfigError::NoWorkers { workers }.into());
        }
        Ok(())
    }

    /// Strict equality check over every field *except* the budget: the
    /// resume criterion. Any other difference forces a fresh search.
    pub fn same_except_budget(&self, other: &Self) -> bool {
        let mut normalized = other.clone();
        normalized.budget = self.budget;
        *self == normalized
    }
}
