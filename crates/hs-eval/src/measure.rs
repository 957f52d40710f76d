//! Performance measures.

use serde::{Deserialize, Serialize};

/// Whether larger or smaller values of a measure are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Minimize
    }
}

/// A performance measure with an optimization direction and an aggregation
/// weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub direction: Direction,
    pub weight: f64,
}

impl Measure {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            weight: 1.0,
        }
    }

    pub fn minimize(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Minimize)
    }

    pub fn maximize(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Maximize)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Orientation-normalized value: smaller is always better.
    pub fn as_loss(&self, value: f64) -> f64 {
        let oriented = match self.direction {
            Direction::Minimize => value,
            Direction::Maximize => -value,
        };
        oriented * self.weight
    }
}
