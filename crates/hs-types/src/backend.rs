//! Concurrency backend selectors.
//!
//! The outer backend schedules candidate batches; [`InnerParallelism`]
//! independently schedules the folds inside one evaluation. Both are plain
//! data passed explicitly through the dispatch chain, never ambient state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a batch of candidates is scheduled for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Backend {
    /// One candidate at a time on the calling thread.
    Sequential,
    /// Contiguous chunks across `workers` threads, one cloned evaluation
    /// context per thread.
    Threads { workers: usize },
    /// Contiguous partitions across `workers` worker processes, each running
    /// an independent copy of the evaluation context.
    Processes {
        workers: usize,
        command: WorkerCommand,
    },
}

impl Backend {
    pub fn threads(workers: usize) -> Self {
        Self::Threads { workers }
    }

    pub fn processes(workers: usize) -> Self {
        Self::Processes {
            workers,
            command: WorkerCommand::default(),
        }
    }

    /// Whether this backend evaluates candidates concurrently.
    pub fn is_parallel(&self) -> bool {
        match self {
            Self::Sequential => false,
            Self::Threads { workers } => *workers > 1,
            Self::Processes { workers, .. } => *workers > 1,
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::Sequential
    }
}

/// How folds inside one evaluation are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InnerParallelism {
    Sequential,
    Threads { workers: usize },
}

impl InnerParallelism {
    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Threads { workers } if *workers > 1)
    }
}

impl Default for InnerParallelism {
    fn default() -> Self {
        Self::Sequential
    }
}

/// How to launch a worker process for [`Backend::Processes`].
///
/// With `program = None` the current executable is re-invoked; the embedding
/// binary is expected to branch into the worker entry point when the worker
/// environment marker is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallelism_flags() {
        assert!(!Backend::Sequential.is_parallel());
        assert!(!Backend::threads(1).is_parallel());
        assert!(Backend::threads(4).is_parallel());
        assert!(Backend::processes(2).is_parallel());
        assert!(!InnerParallelism::Sequential.is_parallel());
        assert!(InnerParallelism::Threads { workers: 2 }.is_parallel());
    }

    #[test]
    fn backend_serialization_round_trip() {
        let backend = Backend::processes(3);
        let json = serde_json::to_string(&backend).unwrap();
        let back: Backend = serde_json::from_str(&json).unwrap();
        assert_eq!(backend, back);
    }
}
