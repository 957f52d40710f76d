//! # hs-eval
//!
//! Resampling-based performance evaluation for HyperSweep.
//!
//! One [`EvalContext`] holds the fixed evaluation setup of a sweep — the
//! resampling plan, the measures, the model specification — and scores one
//! candidate configuration per [`Evaluator::evaluate`] call, mutating its
//! active configuration in place. The context is therefore not safe to share
//! across concurrent workers; the scheduler clones it per worker instead.

pub mod context;
pub mod measure;
pub mod model;
pub mod resample;

pub use context::{EvalContext, EvalOutcome, Evaluator};
pub use measure::{Direction, Measure};
pub use model::{FitReport, ModelSpec, SyntheticModel};
pub use resample::{ResamplePlan, Split};

/// Result type alias for evaluation operations.
pub type EvalResult<T> = Result<T, hs_types::EvalError>;
