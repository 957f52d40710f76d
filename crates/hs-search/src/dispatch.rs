//! Order-preserving batch dispatch across the three scheduling backends.

use tracing::debug;

use hs_eval::{EvalOutcome, Evaluator};
use hs_types::{Backend, Candidate, HistoryEntry, SweepError, SweepResult};

use crate::progress::{ProgressEvent, ProgressRelay};
use crate::worker;

/// Evaluate an ordered batch of candidates, returning one entry per
/// candidate **in input order**, regardless of backend or completion order.
///
/// Any candidate's failure aborts the whole batch; no partial entry is
/// recorded for a failed candidate and no retries happen at this layer.
pub fn dispatch_batch<E: Evaluator>(
    backend: &Backend,
    ctx: &mut E,
    batch: &[Candidate],
    progress: Option<&ProgressRelay>,
) -> SweepResult<Vec<HistoryEntry>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }
    match backend {
        Backend::Sequential => dispatch_chunk(ctx, batch, progress, 0),
        Backend::Threads { workers } => dispatch_threads(*workers, ctx, batch, progress),
        Backend::Processes { workers, command } => {
            worker::dispatch_processes(*workers, command, ctx, batch, progress)
        }
    }
}

/// Build the history entry for one evaluated candidate. Strategy extras are
/// merged later, on the orchestrating thread.
pub(crate) fn entry_for(candidate: &Candidate, outcome: EvalOutcome) -> HistoryEntry {
    HistoryEntry {
        params: candidate.params().clone(),
        measures: outcome.measures,
        aggregated: outcome.aggregated,
        per_fold: outcome.per_fold,
        annotation: candidate.annotation().cloned(),
        extras: serde_json::Map::new(),
    }
}

/// Evaluate one contiguous chunk on the calling thread.
pub(crate) fn dispatch_chunk<E: Evaluator>(
    ctx: &mut E,
    chunk: &[Candidate],
    progress: Option<&ProgressRelay>,
    worker_idx: usize,
) -> SweepResult<Vec<HistoryEntry>> {
    let mut entries = Vec::with_capacity(chunk.len());
    for (i, candidate) in chunk.iter().enumerate() {
        let outcome = ctx.evaluate(candidate.params())?;
        let entry = entry_for(candidate, outcome);
        if let Some(relay) = progress {
            relay.send(ProgressEvent {
                completed: i + 1,
                total: chunk.len(),
                worker: worker_idx,
                objective: entry.aggregated.first().copied(),
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn dispatch_threads<E: Evaluator>(
    workers: usize,
    ctx: &mut E,
    batch: &[Candidate],
    progress: Option<&ProgressRelay>,
) -> SweepResult<Vec<HistoryEntry>> {
    let workers = workers.min(batch.len());
    if workers <= 1 {
        // Cloning overhead is not justified on a single thread of execution.
        debug!("single-threaded fallback for thread backend");
        return dispatch_chunk(ctx, batch, progress, 0);
    }

    let chunk_size = (batch.len() + workers - 1) / workers;

    // One cloned context per worker, allocated up front; chunk results are
    // joined in chunk order, which preserves overall input order without
    // completion-order synchronization.
    std::thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(chunk_size)
            .enumerate()
            .map(|(worker_idx, chunk)| {
                let mut local_ctx = ctx.clone();
                let relay = progress.cloned();
                scope.spawn(move || dispatch_chunk(&mut local_ctx, chunk, relay.as_ref(), worker_idx))
            })
            .collect();

        let mut entries = Vec::with_capacity(batch.len());
        for handle in handles {
            let chunk_entries = handle
                .join()
                .map_err(|_| SweepError::Internal("evaluation worker panicked".to_string()))??;
            entries.extend(chunk_entries);
        }
        Ok(entries)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_eval::{EvalContext, Measure, ResamplePlan, SyntheticModel};
    use hs_types::{ParamMap, ParamValue};
    use std::collections::HashMap;

    fn context() -> EvalContext<SyntheticModel> {
        let mut optimum = HashMap::new();
        optimum.insert("x".to_string(), 3.0);
        EvalContext::new(
            ParamMap::new(),
            ResamplePlan::KFold { folds: 3, seed: 11 },
            vec![Measure::minimize("loss")],
            30,
            SyntheticModel::new(optimum).with_noise(0.01),
        )
    }

    fn failing_context() -> EvalContext<SyntheticModel> {
        let mut optimum = HashMap::new();
        optimum.insert("x".to_string(), 3.0);
        EvalContext::new(
            ParamMap::new(),
            ResamplePlan::KFold { folds: 3, seed: 11 },
            vec![Measure::minimize("loss")],
            30,
            SyntheticModel::new(optimum).failing_on("poison"),
        )
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| {
                let mut params = ParamMap::new();
                params.insert("x".to_string(), ParamValue::Float(i as f64));
                Candidate::Plain(params)
            })
            .collect()
    }

    #[test]
    fn sequential_preserves_input_order() {
        let batch = candidates(5);
        let entries = dispatch_batch(&Backend::Sequential, &mut context(), &batch, None).unwrap();
        assert_eq!(entries.len(), 5);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.params.get("x"), Some(&ParamValue::Float(i as f64)));
        }
    }

    #[test]
    fn backend_invariance_sequential_vs_threads() {
        let batch = candidates(7);
        let sequential =
            dispatch_batch(&Backend::Sequential, &mut context(), &batch, None).unwrap();
        let threaded =
            dispatch_batch(&Backend::threads(3), &mut context(), &batch, None).unwrap();
        assert_eq!(sequential, threaded);
    }

    #[test]
    fn single_thread_request_falls_back_to_sequential() {
        let batch = candidates(4);
        let one = dispatch_batch(&Backend::threads(1), &mut context(), &batch, None).unwrap();
        let seq = dispatch_batch(&Backend::Sequential, &mut context(), &batch, None).unwrap();
        assert_eq!(one, seq);
    }

    #[test]
    fn more_workers_than_candidates_is_fine() {
        let batch = candidates(2);
        let entries = dispatch_batch(&Backend::threads(8), &mut context(), &batch, None).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let entries = dispatch_batch(&Backend::threads(4), &mut context(), &[], None).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn failure_aborts_whole_batch() {
        let mut batch = candidates(3);
        let mut poisoned = ParamMap::new();
        poisoned.insert("x".to_string(), ParamValue::Float(1.0));
        poisoned.insert("poison".to_string(), ParamValue::Int(1));
        batch.insert(1, Candidate::Plain(poisoned));

        for backend in [Backend::Sequential, Backend::threads(2)] {
            let result = dispatch_batch(&backend, &mut failing_context(), &batch, None);
            assert!(result.is_err(), "backend {backend:?} should fail");
        }
    }

    #[test]
    fn progress_events_are_emitted() {
        let batch = candidates(3);
        let (relay, rx) = ProgressRelay::bounded(16);
        dispatch_batch(&Backend::Sequential, &mut context(), &batch, Some(&relay)).unwrap();
        drop(relay);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().completed, 3);
    }

    #[test]
    fn annotation_is_carried_into_entry() {
        let mut params = ParamMap::new();
        params.insert("x".to_string(), ParamValue::Float(1.0));
        let batch = vec![Candidate::Annotated(
            params,
            serde_json::json!({"draw": 4}),
        )];
        let entries = dispatch_batch(&Backend::Sequential, &mut context(), &batch, None).unwrap();
        assert_eq!(entries[0].annotation.as_ref().unwrap()["draw"], 4);
    }
}
