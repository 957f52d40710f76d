//! Demo sweep over the synthetic reference model.
//!
//! Doubles as the worker entry point for the process backend: when launched
//! with the worker environment marker set, it evaluates one partition and
//! exits.

use std::collections::HashMap;

use hs_eval::{EvalContext, Measure, ResamplePlan, SyntheticModel};
use hs_search::{run_sweep, BestByMeasure, GridStrategy, ProgressRelay, ProgressTracker};
use hs_types::{Backend, ParamMap, ParamSpace, SweepConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    if hs_search::worker_mode_active() {
        hs_search::run_worker::<EvalContext<SyntheticModel>>()?;
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let backend = match std::env::var("HS_BACKEND").as_deref() {
        Ok("threads") => Backend::threads(4),
        Ok("processes") => Backend::processes(2),
        _ => Backend::Sequential,
    };
    info!(?backend, "starting demo sweep");

    let space = ParamSpace::new()
        .add_int("depth", 1, 6)
        .add_float("rate", 0.0, 1.0);

    let config = SweepConfig::new("demo", space, "grid")
        .with_budget(24)
        .with_backend(backend)
        .with_verbose(true);

    let mut optimum = HashMap::new();
    optimum.insert("depth".to_string(), 4.0);
    optimum.insert("rate".to_string(), 0.5);
    let ctx = EvalContext::new(
        ParamMap::new(),
        ResamplePlan::KFold { folds: 5, seed: 17 },
        vec![Measure::minimize("loss")],
        200,
        SyntheticModel::new(optimum).with_noise(0.05),
    );

    let (relay, rx) = ProgressRelay::bounded(64);
    let tracker = ProgressTracker::new();
    let watcher = tracker.watch(rx);

    let strategy = GridStrategy::default();
    let rule = BestByMeasure::new(Measure::minimize("loss"));
    let outcome = run_sweep(config, &strategy, &rule, ctx, Some(&relay))?;

    drop(relay);
    let _ = watcher.join();

    info!(
        evaluated = outcome.report.history.len(),
        best = ?outcome.report.best_params,
        final_loss = outcome.report.loss_curve.as_ref().and_then(|c| c.last().copied()),
        "sweep finished"
    );
    Ok(())
}
