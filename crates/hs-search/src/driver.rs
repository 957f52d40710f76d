//! The search loop: drives generation and dispatch until the budget is met
//! or the strategy is exhausted.

use serde_json::Value;
use tracing::{debug, info, warn};

use hs_eval::Evaluator;
use hs_types::{History, SweepConfig, SweepResult};

use crate::buffer::SupplyBuffer;
use crate::dispatch::dispatch_batch;
use crate::progress::ProgressRelay;
use crate::strategy::SearchStrategy;

/// The mutable search position carried across rounds and resume calls:
/// history, supply buffer, and the strategy's opaque generator state.
#[derive(Debug, Clone)]
pub struct SearchCursor {
    pub history: History,
    pub buffer: SupplyBuffer,
    pub state: Value,
}

impl SearchCursor {
    /// Fresh cursor for a new search, with the strategy's initial state.
    pub fn fresh(state: Value) -> Self {
        Self {
            history: History::absent(),
            buffer: SupplyBuffer::new(),
            state,
        }
    }
}

/// Run the search until `config.budget` entries exist or the strategy is
/// exhausted.
///
/// The buffer is always drained (up to the remaining budget) before any new
/// generation call; surplus candidates from an over-producing generator are
/// buffered, never discarded. At exit the history holds exactly
/// `min(budget, producible)` entries — never more than the budget.
pub fn search_loop<E: Evaluator>(
    cursor: &mut SearchCursor,
    strategy: &dyn SearchStrategy,
    config: &SweepConfig,
    ctx: &mut E,
    progress: Option<&ProgressRelay>,
) -> SweepResult<()> {
    let budget = config.budget;
    let progress = if config.verbose { progress } else { None };
    let mut evaluated = cursor.history.len();

    // Buffered candidates first: generated work from earlier rounds is
    // consumed before the strategy is asked for anything new.
    if evaluated < budget && !cursor.buffer.is_empty() {
        let batch = cursor.buffer.take(budget - evaluated);
        info!(count = batch.len(), "draining supply buffer");
        let entries = dispatch_batch(&config.backend, ctx, &batch, progress)?;
        append_with_extras(cursor, strategy, entries);
        evaluated = cursor.history.len();
    }

    while evaluated < budget {
        let remaining = budget - evaluated;
        let state = std::mem::take(&mut cursor.state);
        let (candidates, new_state) =
            strategy.generate(&config.base, &cursor.history, state, remaining, config.verbose)?;
        cursor.state = new_state;

        if candidates.is_empty() {
            warn!(
                evaluated,
                budget,
                strategy = strategy.name(),
                "strategy exhausted before the budget was reached"
            );
            break;
        }

        let mut batch = candidates;
        if batch.len() > remaining {
            let surplus = batch.split_off(remaining);
            debug!(count = surplus.len(), "buffering surplus candidates");
            cursor.buffer.push_surplus(surplus);
        }

        let entries = dispatch_batch(&config.backend, ctx, &batch, progress)?;
        append_with_extras(cursor, strategy, entries);
        evaluated = cursor.history.len();
    }

    Ok(())
}

/// Merge strategy extras into each entry and append, one entry at a time so
/// every extras call sees the history-so-far.
fn append_with_extras(
    cursor: &mut SearchCursor,
    strategy: &dyn SearchStrategy,
    entries: Vec<hs_types::HistoryEntry>,
) {
    for mut entry in entries {
        entry.extras = strategy.extras(&cursor.history, &cursor.state, &entry);
        cursor.history.append(vec![entry]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_eval::{EvalContext, Measure, ResamplePlan, SyntheticModel};
    use hs_types::{Candidate, ParamMap, ParamSpace, ParamValue};
    use serde_json::json;
    use std::collections::HashMap;

    /// Test stub: always proposes `batch` candidates per call regardless of
    /// the remaining budget (over-producing), up to an optional total, and
    /// counts its own generation calls in the state.
    struct FixedBatch {
        batch: usize,
        total: Option<usize>,
    }

    impl SearchStrategy for FixedBatch {
        fn name(&self) -> &str {
            "fixed_batch"
        }

        fn setup(
            &self,
            _base: &ParamMap,
            _space: &ParamSpace,
            _budget: usize,
            _verbose: bool,
        ) -> SweepResult<Value> {
            Ok(json!({ "generated": 0, "calls": 0 }))
        }

        fn generate(
            &self,
            _base: &ParamMap,
            _history: &History,
            state: Value,
            _remaining: usize,
            _verbose: bool,
        ) -> SweepResult<(Vec<Candidate>, Value)> {
            let generated = state["generated"].as_u64().unwrap_or(0) as usize;
            let calls = state["calls"].as_u64().unwrap_or(0);

            let count = match self.total {
                Some(total) => self.batch.min(total.saturating_sub(generated)),
                None => self.batch,
            };
            let batch: Vec<Candidate> = (0..count)
                .map(|i| {
                    let mut params = ParamMap::new();
                    params.insert("x".to_string(), ParamValue::Float((generated + i) as f64));
                    Candidate::Plain(params)
                })
                .collect();

            let new_state = json!({ "generated": generated + count, "calls": calls + 1 });
            Ok((batch, new_state))
        }

        fn default_budget(&self, _space: &ParamSpace) -> usize {
            self.batch
        }
    }

    fn context() -> EvalContext<SyntheticModel> {
        let mut optimum = HashMap::new();
        optimum.insert("x".to_string(), 2.0);
        EvalContext::new(
            ParamMap::new(),
            ResamplePlan::Holdout {
                test_fraction: 0.3,
                seed: 3,
            },
            vec![Measure::minimize("loss")],
            10,
            SyntheticModel::new(optimum),
        )
    }

    fn config(budget: usize) -> SweepConfig {
        let space = ParamSpace::new().add_int("x", 0, 100);
        SweepConfig::new("loop_test", space, "fixed_batch").with_budget(budget)
    }

    fn run(
        strategy: &dyn SearchStrategy,
        budget: usize,
    ) -> (SearchCursor, EvalContext<SyntheticModel>) {
        let cfg = config(budget);
        let state = strategy
            .setup(&cfg.base, &cfg.space, budget, false)
            .unwrap();
        let mut cursor = SearchCursor::fresh(state);
        let mut ctx = context();
        search_loop(&mut cursor, strategy, &cfg, &mut ctx, None).unwrap();
        (cursor, ctx)
    }

    #[test]
    fn history_reaches_exact_budget() {
        let strategy = FixedBatch {
            batch: 2,
            total: None,
        };
        let (cursor, _) = run(&strategy, 6);
        assert_eq!(cursor.history.len(), 6);
        assert!(cursor.buffer.is_empty());
        assert_eq!(cursor.state["calls"], 3);
    }

    #[test]
    fn history_never_exceeds_budget() {
        // Batches of 5 against a budget of 7: the loop must truncate.
        let strategy = FixedBatch {
            batch: 5,
            total: None,
        };
        let (cursor, _) = run(&strategy, 7);
        assert_eq!(cursor.history.len(), 7);
        // 5 evaluated + 2 from the second batch; 3 surplus buffered.
        assert_eq!(cursor.buffer.len(), 3);
        assert_eq!(cursor.state["calls"], 2);
    }

    #[test]
    fn exhaustion_stops_early_with_partial_history() {
        let strategy = FixedBatch {
            batch: 2,
            total: Some(3),
        };
        let (cursor, _) = run(&strategy, 10);
        assert_eq!(cursor.history.len(), 3);
        assert!(cursor.buffer.is_empty());
    }

    #[test]
    fn no_candidate_is_generated_twice_or_dropped() {
        let strategy = FixedBatch {
            batch: 5,
            total: None,
        };
        let (cursor, _) = run(&strategy, 12);

        // Every generated index appears exactly once across history+buffer.
        let mut seen: Vec<f64> = cursor
            .history
            .entries()
            .iter()
            .map(|e| e.params["x"].as_f64().unwrap())
            .collect();
        for candidate in cursor.buffer.clone().take(100) {
            seen.push(candidate.params()["x"].as_f64().unwrap());
        }
        let generated = cursor.state["generated"].as_u64().unwrap() as usize;
        assert_eq!(seen.len(), generated);
        let mut sorted = seen.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted.dedup();
        assert_eq!(sorted.len(), generated);
    }

    #[test]
    fn history_order_is_generation_order() {
        let strategy = FixedBatch {
            batch: 3,
            total: None,
        };
        let (cursor, _) = run(&strategy, 9);
        for (i, entry) in cursor.history.entries().iter().enumerate() {
            assert_eq!(entry.params["x"].as_f64().unwrap(), i as f64);
        }
    }

    #[test]
    fn buffer_is_drained_before_generation() {
        let strategy = FixedBatch {
            batch: 4,
            total: None,
        };
        let cfg = config(2);
        let state = strategy.setup(&cfg.base, &cfg.space, 2, false).unwrap();
        let mut cursor = SearchCursor::fresh(state);
        let mut ctx = context();

        // First round: 2 evaluated, 2 buffered, one generation call.
        search_loop(&mut cursor, &strategy, &cfg, &mut ctx, None).unwrap();
        assert_eq!(cursor.history.len(), 2);
        assert_eq!(cursor.buffer.len(), 2);
        assert_eq!(cursor.state["calls"], 1);

        // Extended budget of 4: both buffered candidates are used and the
        // strategy is not called again.
        let cfg = config(4);
        search_loop(&mut cursor, &strategy, &cfg, &mut ctx, None).unwrap();
        assert_eq!(cursor.history.len(), 4);
        assert!(cursor.buffer.is_empty());
        assert_eq!(cursor.state["calls"], 1);
    }

    #[test]
    fn extras_see_history_so_far() {
        /// Records the history length at extras time.
        struct WithExtras(FixedBatch);
        impl SearchStrategy for WithExtras {
            fn name(&self) -> &str {
                "with_extras"
            }
            fn setup(
                &self,
                base: &ParamMap,
                space: &ParamSpace,
                budget: usize,
                verbose: bool,
            ) -> SweepResult<Value> {
                self.0.setup(base, space, budget, verbose)
            }
            fn generate(
                &self,
                base: &ParamMap,
                history: &History,
                state: Value,
                remaining: usize,
                verbose: bool,
            ) -> SweepResult<(Vec<Candidate>, Value)> {
                self.0.generate(base, history, state, remaining, verbose)
            }
            fn default_budget(&self, space: &ParamSpace) -> usize {
                self.0.default_budget(space)
            }
            fn extras(
                &self,
                history: &History,
                _state: &Value,
                _entry: &hs_types::HistoryEntry,
            ) -> serde_json::Map<String, Value> {
                let mut fields = serde_json::Map::new();
                fields.insert("seen".to_string(), json!(history.len()));
                fields
            }
        }

        let strategy = WithExtras(FixedBatch {
            batch: 2,
            total: None,
        });
        let (cursor, _) = run(&strategy, 4);
        for (i, entry) in cursor.history.entries().iter().enumerate() {
            assert_eq!(entry.extras["seen"], json!(i));
        }
    }
}
