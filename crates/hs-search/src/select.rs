//! Selection rules: choosing the best history entry and deriving the
//! training-loss curve.

use hs_eval::Measure;
use hs_types::{History, HistoryEntry, SweepError, SweepResult};

/// Picks a winner from the history and assigns each entry a scalar loss.
///
/// Deterministic given the history; the scheduler calls it only at
/// finalization and loss-curve extraction.
pub trait SelectionRule: Send + Sync {
    fn name(&self) -> &str;

    /// The entry judged best. An absent or empty history is a caller
    /// contract violation, not a user error.
    fn best<'a>(&self, history: &'a History) -> SweepResult<&'a HistoryEntry>;

    /// One orientation-normalized loss per entry (smaller is better), in
    /// history order. Entries missing the rule's measure get an infinite
    /// loss so they can never win.
    fn losses(&self, history: &History) -> Vec<f64>;
}

/// Default rule: rank entries by one measure, respecting its direction.
#[derive(Debug, Clone)]
pub struct BestByMeasure {
    measure: Measure,
}

impl BestByMeasure {
    pub fn new(measure: Measure) -> Self {
        Self { measure }
    }

    fn entry_loss(&self, entry: &HistoryEntry) -> f64 {
        entry
            .measures
            .iter()
            .position(|name| *name == self.measure.name)
            .and_then(|idx| entry.aggregated.get(idx))
            .map(|value| self.measure.as_loss(*value))
            .unwrap_or(f64::INFINITY)
    }
}

impl SelectionRule for BestByMeasure {
    fn name(&self) -> &str {
        "best_by_measure"
    }

    fn best<'a>(&self, history: &'a History) -> SweepResult<&'a HistoryEntry> {
        let entries = history.entries();
        if entries.is_empty() {
            return Err(SweepError::Internal(
                "selection over an absent or empty history".to_string(),
            ));
        }
        // First minimal entry wins: deterministic under ties.
        let mut best_idx = 0;
        let mut best_loss = self.entry_loss(&entries[0]);
        for (idx, entry) in entries.iter().enumerate().skip(1) {
            let loss = self.entry_loss(entry);
            if loss < best_loss {
                best_idx = idx;
                best_loss = loss;
            }
        }
        Ok(&entries[best_idx])
    }

    fn losses(&self, history: &History) -> Vec<f64> {
        history
            .entries()
            .iter()
            .map(|entry| self.entry_loss(entry))
            .collect()
    }
}

/// Running minimum of a loss sequence: position `i` holds the minimum among
/// `losses[0..=i]`. Non-increasing by construction.
pub fn running_minimum(losses: &[f64]) -> Vec<f64> {
    let mut current = f64::INFINITY;
    losses
        .iter()
        .map(|loss| {
            current = current.min(*loss);
            current
        })
        .collect()
}

/// The training-loss curve for iteration-curve consumers. Absent history ⇒
/// absent curve, not an error.
pub fn loss_curve(rule: &dyn SelectionRule, history: &History) -> Option<Vec<f64>> {
    if history.is_absent() {
        return None;
    }
    Some(running_minimum(&rule.losses(history)))
}
