//! Resume control: extend a prior search or start fresh.

use tracing::{info, warn};

use hs_types::SweepConfig;

use crate::finalize::MetaState;

/// Whether a re-invocation may reuse prior meta-state.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeDecision {
    /// The new configuration differs only in a grown budget: extend the
    /// existing history, reusing buffer, generator state, and context.
    Extend,
    /// Anything else: discard all prior state and search from scratch.
    Fresh { reason: String },
}

/// Strict equality-except-budget check against the prior configuration
/// snapshot. No partial reuse is attempted for any other change.
pub fn plan<E>(prior: Option<&MetaState<E>>, config: &SweepConfig) -> ResumeDecision {
    let prior = match prior {
        Some(meta) => meta,
        None => {
            return ResumeDecision::Fresh {
                reason: "no prior search state".to_string(),
            }
        }
    };

    if !config.same_except_budget(&prior.config) {
        warn!("configuration changed beyond the budget; prior state unusable");
        return ResumeDecision::Fresh {
            reason: "configuration changed beyond the budget".to_string(),
        };
    }

    if config.budget < prior.config.budget {
        warn!(
            prior = prior.config.budget,
            requested = config.budget,
            "budget shrank; prior state unusable"
        );
        return ResumeDecision::Fresh {
            reason: "requested budget is below the prior budget".to_string(),
        };
    }

    info!(
        prior = prior.config.budget,
        requested = config.budget,
        "extending prior search"
    );
    ResumeDecision::Extend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SupplyBuffer;
    use hs_eval::{EvalContext, Measure, ResamplePlan, SyntheticModel};
    use hs_types::{Backend, History, ParamMap, ParamSpace};
    use serde_json::json;
    use std::collections::HashMap;

    fn config(budget: usize) -> SweepConfig {
        let space = ParamSpace::new().add_int("x", 0, 9);
        SweepConfig::new("resume_test", space, "grid").with_budget(budget)
    }

    fn meta(budget: usize) -> MetaState<EvalContext<SyntheticModel>> {
        let mut optimum = HashMap::new();
        optimum.insert("x".to_string(), 2.0);
        MetaState {
            config: config(budget),
            history: History::absent(),
            buffer: SupplyBuffer::new(),
            state: json!({"cursor": budget}),
            context: EvalContext::new(
                ParamMap::new(),
                ResamplePlan::Holdout {
                    test_fraction: 0.5,
                    seed: 0,
                },
                vec![Measure::minimize("loss")],
                4,
                SyntheticModel::new(optimum),
            ),
        }
    }

    #[test]
    fn no_prior_state_is_fresh() {
        let decision = plan::<EvalContext<SyntheticModel>>(None, &config(5));
        assert!(matches!(decision, ResumeDecision::Fresh { .. }));
    }

    #[test]
    fn grown_budget_extends() {
        let prior = meta(5);
        assert_eq!(plan(Some(&prior), &config(8)), ResumeDecision::Extend);
    }

    #[test]
    fn equal_budget_extends() {
        let prior = meta(5);
        assert_eq!(plan(Some(&prior), &config(5)), ResumeDecision::Extend);
    }

    #[test]
    fn shrunk_budget_is_fresh() {
        let prior = meta(5);
        assert!(matches!(
            plan(Some(&prior), &config(3)),
            ResumeDecision::Fresh { .. }
        ));
    }

    #[test]
    fn any_other_field_change_is_fresh() {
        let prior = meta(5);

        let changed_backend = config(8).with_backend(Backend::threads(4));
        assert!(matches!(
            plan(Some(&prior), &changed_backend),
            ResumeDecision::Fresh { .. }
        ));

        let mut changed_strategy = config(8);
        changed_strategy.strategy = "random".to_string();
        assert!(matches!(
            plan(Some(&prior), &changed_strategy),
            ResumeDecision::Fresh { .. }
        ));

        let changed_space = {
            let space = ParamSpace::new().add_int("x", 0, 5);
            SweepConfig::new("resume_test", space, "grid").with_budget(8)
        };
        assert!(matches!(
            plan(Some(&prior), &changed_space),
            ResumeDecision::Fresh { .. }
        ));
    }
}
