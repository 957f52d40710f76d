//! Finalization: winner selection, optional refit, report assembly, and the
//! persistable meta-state.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use hs_eval::{Evaluator, FitReport};
use hs_types::{History, HistoryEntry, ParamMap, SweepConfig, SweepResult};

use crate::buffer::SupplyBuffer;
use crate::driver::SearchCursor;
use crate::select::{loss_curve, SelectionRule};
use crate::strategy::SearchStrategy;

/// User-facing result of a sweep. Strategy-private annotations are stripped
/// from every exposed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub best_params: ParamMap,
    pub best_entry: HistoryEntry,
    /// Absent when refit was skipped by configuration.
    pub refit_report: Option<FitReport>,
    /// Running-minimum training-loss curve, one value per history entry.
    pub loss_curve: Option<Vec<f64>>,
    pub history: History,
    /// Strategy-specific summary fields.
    pub summary: Map<String, Value>,
}

/// Everything that must survive between an initial search and a later
/// extension: history, config snapshot, supply buffer, generator state, and
/// the evaluation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState<E> {
    pub config: SweepConfig,
    pub history: History,
    pub buffer: SupplyBuffer,
    pub state: Value,
    pub context: E,
}

impl<E: Serialize + DeserializeOwned> MetaState<E> {
    pub fn to_json(&self) -> SweepResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SweepResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> SweepResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> SweepResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Select the best entry, optionally refit it on the full data, and
/// assemble the report plus the meta-state for a potential resume.
pub fn finalize<E: Evaluator>(
    config: &SweepConfig,
    strategy: &dyn SearchStrategy,
    rule: &dyn SelectionRule,
    ctx: &E,
    cursor: &SearchCursor,
) -> SweepResult<(SweepReport, MetaState<E>)> {
    let best = rule.best(&cursor.history)?;
    info!(params = ?best.params, "best configuration selected");

    let refit_report = if config.refit {
        Some(ctx.refit(&best.params)?)
    } else {
        None
    };

    let report = SweepReport {
        best_params: best.params.clone(),
        best_entry: best.stripped(),
        refit_report,
        loss_curve: loss_curve(rule, &cursor.history),
        history: cursor.history.stripped(),
        summary: strategy.summary(&cursor.history, &cursor.state),
    };

    let meta = MetaState {
        config: config.clone(),
        history: cursor.history.clone(),
        buffer: cursor.buffer.clone(),
        state: cursor.state.clone(),
        context: ctx.clone(),
    };

    Ok((report, meta))
}
