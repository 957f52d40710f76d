//! Model specifications: the pluggable learner behind the evaluation unit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use hs_types::{EvalError, ParamMap};

use crate::measure::{Direction, Measure};
use crate::resample::Split;
use crate::EvalResult;

/// Report produced by retraining a configuration on the full dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub params: ParamMap,
    pub train_score: f64,
    pub n_rows: usize,
}

/// A learner that can be scored on one resampling split and refit on the
/// full data.
///
/// Implementations must be serializable so the process backend can ship an
/// independent copy to each worker.
pub trait ModelSpec: Clone + Send + Serialize + DeserializeOwned + 'static {
    /// Score `params` on one split, returning one value per measure, in
    /// measure order.
    fn fold_scores(
        &self,
        params: &ParamMap,
        split: &Split,
        measures: &[Measure],
    ) -> EvalResult<Vec<f64>>;

    /// Retrain on the full dataset.
    fn refit(&self, params: &ParamMap, n_rows: usize) -> EvalResult<FitReport>;
}

/// Deterministic reference model: a quadratic bowl over the named
/// parameters.
///
/// The loss of a configuration is the squared distance to `optimum`, plus a
/// small fold-dependent jitter scaled by `noise` so per-fold scores differ
/// while remaining fully reproducible. `fail_on` names a parameter whose
/// presence makes the fit fail, for exercising failure paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticModel {
    pub optimum: HashMap<String, f64>,
    pub noise: f64,
    pub fail_on: Option<String>,
}

impl SyntheticModel {
    pub fn new(optimum: HashMap<String, f64>) -> Self {
        Self {
            optimum,
            noise: 0.0,
            fail_on: None,
        }
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn failing_on(mut self, param: &str) -> Self {
        self.fail_on = Some(param.to_string());
        self
    }

    fn loss(&self, params: &ParamMap) -> EvalResult<f64> {
        if let Some(poison) = &self.fail_on {
            if params.contains_key(poison) {
                return Err(EvalError::Fit {
                    message: format!("cannot fit with parameter {poison}"),
                });
            }
        }
        let mut total = 0.0;
        for (name, target) in &self.optimum {
            let value = params
                .get(name)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| EvalError::MissingParam { name: name.clone() })?;
            total += (value - target) * (value - target);
        }
        Ok(total)
    }
}

impl ModelSpec for SyntheticModel {
    fn fold_scores(
        &self,
        params: &ParamMap,
        split: &Split,
        measures: &[Measure],
    ) -> EvalResult<Vec<f64>> {
        let loss = self.loss(params)?;
        // Deterministic per-fold fingerprint in [0, 1).
        let fingerprint = split.test.first().copied().unwrap_or(0) * 31 + split.test.len();
        let jitter = self.noise * ((fingerprint % 97) as f64 / 97.0);

        Ok(measures
            .iter()
            .map(|m| match m.direction {
                Direction::Minimize => loss + jitter,
                Direction::Maximize => 1.0 / (1.0 + loss + jitter),
            })
            .collect())
    }

    fn refit(&self, params: &ParamMap, n_rows: usize) -> EvalResult<FitReport> {
        let loss = self.loss(params)?;
        Ok(FitReport {
            params: params.clone(),
            train_score: loss,
            n_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_types::ParamValue;

    fn model() -> SyntheticModel {
        let mut optimum = HashMap::new();
        optimum.insert("x".to_string(), 2.0);
        SyntheticModel::new(optimum)
    }

    fn params(x: f64) -> ParamMap {
        let mut p = ParamMap::new();
        p.insert("x".to_string(), ParamValue::Float(x));
        p
    }

    fn split() -> Split {
        Split {
            train: vec![0, 1, 2],
            test: vec![3, 4],
        }
    }

    #[test]
    fn loss_is_squared_distance() {
        let m = model();
        let scores = m
            .fold_scores(&params(4.0), &split(), &[Measure::minimize("loss")])
            .unwrap();
        assert_eq!(scores, vec![4.0]);
    }

    #[test]
    fn maximize_measure_inverts() {
        let m = model();
        let scores = m
            .fold_scores(&params(2.0), &split(), &[Measure::maximize("score")])
            .unwrap();
        assert_eq!(scores, vec![1.0]); // at the optimum
    }

    #[test]
    fn fold_scores_deterministic() {
        let m = model().with_noise(0.1);
        let a = m
            .fold_scores(&params(3.0), &split(), &[Measure::minimize("loss")])
            .unwrap();
        let b = m
            .fold_scores(&params(3.0), &split(), &[Measure::minimize("loss")])
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_param_is_an_error() {
        let m = model();
        let err = m.fold_scores(&ParamMap::new(), &split(), &[Measure::minimize("loss")]);
        assert!(matches!(err, Err(EvalError::MissingParam { .. })));
    }

    #[test]
    fn poisoned_param_fails_fit() {
        let m = model().failing_on("x");
        let err = m.fold_scores(&params(2.0), &split(), &[Measure::minimize("loss")]);
        assert!(matches!(err, Err(EvalError::Fit { .. })));
    }

    #[test]
    fn refit_reports_full_data() {
        let m = model();
        let report = m.refit(&params(3.0), 100).unwrap();
        assert_eq!(report.train_score, 1.0);
        assert_eq!(report.n_rows, 100);
    }
}
