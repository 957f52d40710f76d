//! Best-effort progress relay.
//!
//! Workers push [`ProgressEvent`]s into a bounded channel; a single consumer
//! aggregates them for reporting. Emission never blocks and never fails the
//! evaluation itself — on overflow new events are dropped.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One completed-candidate notification from a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Candidates completed so far within the worker's own partition.
    pub completed: usize,
    /// Size of the worker's partition.
    pub total: usize,
    /// Worker index (0 for the sequential backend).
    pub worker: usize,
    /// First aggregated measure value, when the worker has it at hand.
    pub objective: Option<f64>,
}

/// Sending half of the progress channel.
#[derive(Debug, Clone)]
pub struct ProgressRelay {
    tx: Sender<ProgressEvent>,
}

impl ProgressRelay {
    /// Create a relay with a bounded buffer of `capacity` events.
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    /// Fire-and-forget send. A full or disconnected channel drops the event.
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.try_send(event);
    }
}

/// Running totals observed by the progress consumer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStats {
    pub events: usize,
    pub completed: usize,
    pub last_objective: Option<f64>,
}

/// Consumes progress events on a background thread and exposes the running
/// totals behind a lock.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    shared: Arc<RwLock<ProgressStats>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain `rx` until the sending side disconnects.
    pub fn watch(&self, rx: Receiver<ProgressEvent>) -> std::thread::JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        std::thread::spawn(move || {
            for event in rx.iter() {
                debug!(
                    worker = event.worker,
                    completed = event.completed,
                    total = event.total,
                    "progress"
                );
                let mut stats = shared.write();
                stats.events += 1;
                stats.completed = stats.completed.max(event.completed);
                if event.objective.is_some() {
                    stats.last_objective = event.objective;
                }
            }
        })
    }

    pub fn stats(&self) -> ProgressStats {
        self.shared.read().clone()
    }
}
