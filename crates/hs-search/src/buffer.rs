//! FIFO buffer for surplus candidates.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use hs_types::Candidate;

/// Holds candidates generated in a previous round but not yet evaluated
/// because the round's budget was smaller than the batch produced.
///
/// Always drained (up to the remaining budget) before any new generation
/// call, so no candidate is generated twice and none is discarded. Persists
/// across resume calls as part of the meta-state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyBuffer {
    queue: VecDeque<Candidate>,
}

impl SupplyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueue surplus candidates, preserving their generation order.
    pub fn push_surplus(&mut self, candidates: Vec<Candidate>) {
        self.queue.extend(candidates);
    }

    /// Dequeue up to `limit` candidates in FIFO order.
    pub fn take(&mut self, limit: usize) -> Vec<Candidate> {
        let count = limit.min(self.queue.len());
        self.queue.drain(..count).collect()
    }
}
