//! Outer/inner parallelism compatibility.

use tracing::warn;

use hs_types::{Backend, InnerParallelism};

/// Validate the combination of outer scheduling backend and fold-level inner
/// parallelism.
///
/// Nesting a parallel inner under a parallel outer oversubscribes the
/// machine, so the inner axis is corrected to sequential. The policy is
/// always warn *and* always auto-correct — never a hard failure.
pub fn normalize_parallelism(backend: &Backend, inner: InnerParallelism) -> InnerParallelism {
    if backend.is_parallel() && inner.is_parallel() {
        warn!(
            ?backend,
            ?inner,
            "parallel resampling under a parallel outer backend; forcing inner to sequential"
        );
        return InnerParallelism::Sequential;
    }
    inner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_outer_keeps_inner() {
        let inner = InnerParallelism::Threads { workers: 4 };
        assert_eq!(
            normalize_parallelism(&Backend::Sequential, inner),
            InnerParallelism::Threads { workers: 4 }
        );
    }

    #[test]
    fn parallel_outer_corrects_parallel_inner() {
        let inner = InnerParallelism::Threads { workers: 4 };
        assert_eq!(
            normalize_parallelism(&Backend::threads(4), inner),
            InnerParallelism::Sequential
        );
        assert_eq!(
            normalize_parallelism(&Backend::processes(2), inner),
            InnerParallelism::Sequential
        );
    }

    #[test]
    fn single_worker_outer_is_not_parallel() {
        let inner = InnerParallelism::Threads { workers: 2 };
        assert_eq!(
            normalize_parallelism(&Backend::threads(1), inner),
            InnerParallelism::Threads { workers: 2 }
        );
    }
}
