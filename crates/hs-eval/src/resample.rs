//! Resampling plans: deterministic, seeded train/test splits.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use hs_types::EvalError;

use crate::EvalResult;

/// One train/test partition of the row indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// How the data is resampled to estimate a configuration's performance.
///
/// Splits are fully determined by the plan and the row count, so every
/// worker — thread or process — derives the identical folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResamplePlan {
    /// K-fold cross-validation over shuffled indices.
    KFold { folds: usize, seed: u64 },
    /// Single shuffled train/test split.
    Holdout { test_fraction: f64, seed: u64 },
}

impl ResamplePlan {
    pub fn fold_count(&self) -> usize {
        match self {
            Self::KFold { folds, .. } => *folds,
            Self::Holdout { .. } => 1,
        }
    }

    /// Materialize the splits for a dataset of `n_rows` rows.
    pub fn splits(&self, n_rows: usize) -> EvalResult<Vec<Split>> {
        match self {
            Self::KFold { folds, seed } => {
                if *folds < 2 {
                    return Err(EvalError::Degenerate {
                        message: format!("k-fold needs at least 2 folds, got {folds}"),
                    });
                }
                if n_rows < *folds {
                    return Err(EvalError::Degenerate {
                        message: format!("{n_rows} rows cannot fill {folds} folds"),
                    });
                }
                let indices = shuffled_indices(n_rows, *seed);
                let mut splits = Vec::with_capacity(*folds);
                for fold in 0..*folds {
                    let test: Vec<usize> = indices
                        .iter()
                        .copied()
                        .skip(fold)
                        .step_by(*folds)
                        .collect();
                    let train: Vec<usize> = indices
                        .iter()
                        .copied()
                        .filter(|i| !test.contains(i))
                        .collect();
                    splits.push(Split { train, test });
                }
                Ok(splits)
            }
            Self::Holdout {
                test_fraction,
                seed,
            } => {
                if !(*test_fraction > 0.0 && *test_fraction < 1.0) {
                    return Err(EvalError::Degenerate {
                        message: format!("holdout fraction must be in (0, 1), got {test_fraction}"),
                    });
                }
                if n_rows < 2 {
                    return Err(EvalError::Degenerate {
                        message: format!("holdout needs at least 2 rows, got {n_rows}"),
                    });
                }
                let indices = shuffled_indices(n_rows, *seed);
                let test_len = ((n_rows as f64 * test_fraction).round() as usize)
                    .clamp(1, n_rows - 1);
                let (test, train) = indices.split_at(test_len);
                Ok(vec![Split {
                    train: train.to_vec(),
                    test: test.to_vec(),
                }])
            }
        }
    }
}

fn shuffled_indices(n_rows: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kfold_partitions_all_rows() {
        let plan = ResamplePlan::KFold { folds: 4, seed: 7 };
        let splits = plan.splits(20).unwrap();
        assert_eq!(splits.len(), 4);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train.len() + split.test.len(), 20);
            assert!(split.test.iter().all(|i| !split.train.contains(i)));
        }
    }

    #[test]
    fn kfold_deterministic_by_seed() {
        let plan = ResamplePlan::KFold { folds: 3, seed: 42 };
        assert_eq!(plan.splits(15).unwrap(), plan.splits(15).unwrap());

        let other = ResamplePlan::KFold { folds: 3, seed: 43 };
        assert_ne!(plan.splits(15).unwrap(), other.splits(15).unwrap());
    }

    #[test]
    fn kfold_rejects_degenerate() {
        assert!(ResamplePlan::KFold { folds: 1, seed: 0 }.splits(10).is_err());
        assert!(ResamplePlan::KFold { folds: 5, seed: 0 }.splits(3).is_err());
    }

    #[test]
    fn holdout_sizes() {
        let plan = ResamplePlan::Holdout {
            test_fraction: 0.25,
            seed: 1,
        };
        let splits = plan.splits(16).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].test.len(), 4);
        assert_eq!(splits[0].train.len(), 12);
    }

    #[test]
    fn holdout_rejects_bad_fraction() {
        for f in [0.0, 1.0, -0.1, 1.5] {
            let plan = ResamplePlan::Holdout {
                test_fraction: f,
                seed: 0,
            };
            assert!(plan.splits(10).is_err(), "fraction {f} should be rejected");
        }
    }
}
