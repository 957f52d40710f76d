//! Sweep orchestration: run records and the top-level entry points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use hs_eval::Evaluator;
use hs_types::{SweepConfig, SweepError, SweepResult};

use crate::backend::normalize_parallelism;
use crate::driver::{search_loop, SearchCursor};
use crate::finalize::{finalize, MetaState, SweepReport};
use crate::progress::ProgressRelay;
use crate::resume::{plan, ResumeDecision};
use crate::select::{BestByMeasure, SelectionRule};
use crate::strategy::SearchStrategy;

/// Lifecycle state for a sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Bookkeeping record for one sweep invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRun {
    pub id: Uuid,
    pub config: SweepConfig,
    pub state: RunState,
    pub evaluated: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SweepRun {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            state: RunState::Pending,
            evaluated: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = RunState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, evaluated: usize) {
        self.state = RunState::Completed;
        self.evaluated = evaluated;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RunState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }
}

/// What a finished sweep hands back: the user-facing report, the meta-state
/// for a later extension, and the run record.
#[derive(Debug, Clone)]
pub struct SweepOutcome<E> {
    pub report: SweepReport,
    pub meta: MetaState<E>,
    pub run: SweepRun,
}

/// Run a fresh sweep to completion.
pub fn run_sweep<E: Evaluator>(
    config: SweepConfig,
    strategy: &dyn SearchStrategy,
    rule: &dyn SelectionRule,
    ctx: E,
    progress: Option<&ProgressRelay>,
) -> SweepResult<SweepOutcome<E>> {
    let mut config = config;
    config.validate()?;
    if config.budget == 0 {
        config.budget = strategy.default_budget(&config.space);
        info!(budget = config.budget, "using strategy default budget");
    }

    let state = strategy.setup(&config.base, &config.space, config.budget, config.verbose)?;
    let cursor = SearchCursor::fresh(state);
    execute(config, strategy, rule, ctx, cursor, progress)
}

/// Extend a prior sweep when the new configuration differs only in a grown
/// budget; otherwise discard the prior state and search from scratch.
pub fn extend_sweep<E: Evaluator>(
    prior: MetaState<E>,
    config: SweepConfig,
    strategy: &dyn SearchStrategy,
    rule: &dyn SelectionRule,
    progress: Option<&ProgressRelay>,
) -> SweepResult<SweepOutcome<E>> {
    // The prior snapshot holds the normalized configuration; normalize the
    // incoming one before comparing so an identical request matches.
    let mut config = config;
    config.inner = normalize_parallelism(&config.backend, config.inner);

    match plan(Some(&prior), &config) {
        ResumeDecision::Extend => {
            config.validate()?;
            let MetaState {
                history,
                buffer,
                state,
                context,
                ..
            } = prior;
            let cursor = SearchCursor {
                history,
                buffer,
                state,
            };
            execute(config, strategy, rule, context, cursor, progress)
        }
        ResumeDecision::Fresh { reason } => {
            warn!(%reason, "prior sweep state discarded; searching from scratch");
            run_sweep(config, strategy, rule, prior.context, progress)
        }
    }
}

fn execute<E: Evaluator>(
    mut config: SweepConfig,
    strategy: &dyn SearchStrategy,
    rule: &dyn SelectionRule,
    mut ctx: E,
    mut cursor: SearchCursor,
    progress: Option<&ProgressRelay>,
) -> SweepResult<SweepOutcome<E>> {
    let inner = normalize_parallelism(&config.backend, config.inner);
    config.inner = inner;
    ctx.set_inner(inner);

    // An unsupported selection rule falls back to the default with a
    // warning, never a hard failure.
    let fallback = if strategy.supports(rule) {
        None
    } else {
        warn!(
            rule = rule.name(),
            strategy = strategy.name(),
            "strategy does not support the requested selection rule; using the default"
        );
        let measure = ctx.measures().first().cloned().ok_or_else(|| {
            SweepError::Internal("evaluator exposes no measures".to_string())
        })?;
        Some(BestByMeasure::new(measure))
    };
    let rule: &dyn SelectionRule = match &fallback {
        Some(default_rule) => default_rule,
        None => rule,
    };

    let mut run = SweepRun::new(config.clone());
    run.mark_running();

    search_loop(&mut cursor, strategy, &config, &mut ctx, progress)?;

    let (report, meta) = finalize(&config, strategy, rule, &ctx, &cursor)?;
    run.mark_completed(cursor.history.len());
    info!(
        evaluated = run.evaluated,
        budget = config.budget,
        "sweep completed"
    );

    Ok(SweepOutcome { report, meta, run })
}
