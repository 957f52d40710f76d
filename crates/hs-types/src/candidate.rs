//! Candidate configurations proposed for evaluation.

use serde::{Deserialize, Serialize};

use crate::params::ParamMap;

/// One hyperparameter configuration proposed by a strategy, with an optional
/// strategy-private annotation.
///
/// The annotation is an opaque JSON blob attached by the generator and
/// consumed only by the strategy's own extras/summary hooks; the scheduler
/// carries it through unchanged and strips it from user-visible output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Candidate {
    Plain(ParamMap),
    Annotated(ParamMap, serde_json::Value),
}

impl Candidate {
    /// The configuration to evaluate.
    pub fn params(&self) -> &ParamMap {
        match self {
            Self::Plain(p) => p,
            Self::Annotated(p, _) => p,
        }
    }

    /// The strategy-private annotation, if any.
    pub fn annotation(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Plain(_) => None,
            Self::Annotated(_, blob) => Some(blob),
        }
    }

    pub fn into_parts(self) -> (ParamMap, Option<serde_json::Value>) {
        match self {
            Self::Plain(p) => (p, None),
            Self::Annotated(p, blob) => (p, Some(blob)),
        }
    }
}
