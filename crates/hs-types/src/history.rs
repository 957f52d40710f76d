//! Append-only evaluation history.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::ParamMap;

/// The result of evaluating one candidate.
///
/// Created exactly once per evaluated candidate and never mutated afterwards,
/// except for the `extras` fields the strategy merges in synchronously right
/// after evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The evaluated configuration.
    pub params: ParamMap,
    /// Measure names, fixed order shared by every entry of a search.
    pub measures: Vec<String>,
    /// Aggregated performance per measure (mean over folds).
    pub aggregated: Vec<f64>,
    /// Per-fold breakdown: `per_fold[fold][measure]`.
    pub per_fold: Vec<Vec<f64>>,
    /// Strategy-private annotation carried over from the candidate.
    pub annotation: Option<Value>,
    /// Strategy-computed extra fields (running statistics and the like).
    pub extras: Map<String, Value>,
}

impl HistoryEntry {
    /// Copy with the strategy-private annotation removed, for user-visible
    /// exposure.
    pub fn stripped(&self) -> Self {
        Self {
            annotation: None,
            ..self.clone()
        }
    }
}

/// Ordered log of evaluation results.
///
/// Starts *absent* (distinguished from empty) so strategies can detect the
/// first generation call. Insertion order is candidate generation order, not
/// completion order. Grows monotonically; never truncated or reordered.
/// Appending to an absent history materializes it: absent + Δ = Δ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Option<Vec<HistoryEntry>>,
}

impl History {
    /// The initial, absent history.
    pub fn absent() -> Self {
        Self { entries: None }
    }

    pub fn is_absent(&self) -> bool {
        self.entries.is_none()
    }

    /// Number of recorded entries; 0 when absent.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View of the recorded entries; empty when absent.
    pub fn entries(&self) -> &[HistoryEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries().get(index)
    }

    /// Append a batch, materializing an absent history.
    pub fn append(&mut self, batch: Vec<HistoryEntry>) {
        self.entries.get_or_insert_with(Vec::new).extend(batch);
    }

    /// Copy with every strategy-private annotation removed.
    pub fn stripped(&self) -> Self {
        Self {
            entries: self
                .entries
                .as_ref()
                .map(|es| es.iter().map(HistoryEntry::stripped).collect()),
        }
    }
}
