//! Process backend: worker protocol and partition dispatch.
//!
//! Each worker process receives a [`WorkerRequest`] — a serialized copy of
//! the evaluation context plus its partition of the batch — as JSON on
//! stdin, and replies on stdout with newline-delimited [`WorkerLine`]s:
//! zero or more progress lines followed by exactly one `done` or `error`
//! line. The parent relays progress best-effort and concatenates partition
//! results in input order.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

use hs_eval::Evaluator;
use hs_types::{Candidate, HistoryEntry, SweepError, SweepResult, WorkerCommand, WorkerError};

use crate::dispatch::entry_for;
use crate::progress::{ProgressEvent, ProgressRelay};

/// Environment marker that switches the embedding binary into worker mode.
pub const WORKER_ENV: &str = "HS_WORKER";

/// Everything a worker needs: an independent copy of the evaluation context
/// and its slice of the candidate batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest<E> {
    pub context: E,
    pub candidates: Vec<Candidate>,
}

/// One line of the worker's stdout stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerLine {
    Progress { completed: usize, total: usize },
    Done { entries: Vec<HistoryEntry> },
    Error { message: String },
}

/// Whether this process was launched as an evaluation worker.
pub fn worker_mode_active() -> bool {
    std::env::var(WORKER_ENV).map(|v| v == "1").unwrap_or(false)
}

/// Evaluate a request, emitting progress lines and a final `done`/`error`
/// line. Shared by the real worker entry and in-process tests.
pub fn handle_request<E: Evaluator>(request: WorkerRequest<E>, emit: &mut dyn FnMut(WorkerLine)) {
    let WorkerRequest {
        mut context,
        candidates,
    } = request;
    let total = candidates.len();
    let mut entries = Vec::with_capacity(total);

    for (i, candidate) in candidates.iter().enumerate() {
        match context.evaluate(candidate.params()) {
            Ok(outcome) => {
                entries.push(entry_for(candidate, outcome));
                emit(WorkerLine::Progress {
                    completed: i + 1,
                    total,
                });
            }
            Err(err) => {
                emit(WorkerLine::Error {
                    message: err.to_string(),
                });
                return;
            }
        }
    }
    emit(WorkerLine::Done { entries });
}

/// Worker-process entry point: read one request from stdin, stream the
/// reply to stdout. The embedding binary calls this when
/// [`worker_mode_active`] is set.
pub fn run_worker<E: Evaluator>() -> SweepResult<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let request: WorkerRequest<E> = serde_json::from_str(&input)?;

    let stdout = std::io::stdout();
    let mut emit = |line: WorkerLine| {
        if let Ok(json) = serde_json::to_string(&line) {
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{json}");
            let _ = handle.flush();
        }
    };
    handle_request(request, &mut emit);
    Ok(())
}

/// Partition `batch` across worker processes and gather the results in
/// partition order.
pub(crate) fn dispatch_processes<E: Evaluator>(
    workers: usize,
    command: &WorkerCommand,
    ctx: &E,
    batch: &[Candidate],
    progress: Option<&ProgressRelay>,
) -> SweepResult<Vec<HistoryEntry>> {
    let workers = workers.min(batch.len()).max(1);
    let chunk_size = (batch.len() + workers - 1) / workers;

    let program = match &command.program {
        Some(path) => path.clone(),
        None => std::env::current_exe()?,
    };

    // Launch every partition before reading any reply, so workers run
    // concurrently.
    let mut children: Vec<Child> = Vec::with_capacity(workers);
    for chunk in batch.chunks(chunk_size) {
        let mut child = Command::new(&program)
            .args(&command.args)
            .env(WORKER_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| WorkerError::Spawn {
                message: e.to_string(),
            })?;

        let request = WorkerRequest {
            context: ctx.clone(),
            candidates: chunk.to_vec(),
        };
        let payload = serde_json::to_string(&request)?;
        let mut stdin = child.stdin.take().ok_or_else(|| WorkerError::Protocol {
            message: "worker stdin unavailable".to_string(),
        })?;
        stdin
            .write_all(payload.as_bytes())
            .map_err(|e| WorkerError::Protocol {
                message: format!("failed to send request: {e}"),
            })?;
        drop(stdin); // close the pipe so the worker sees end of input

        debug!(candidates = chunk.len(), "worker launched");
        children.push(child);
    }

    // One reader thread per child keeps progress flowing from every
    // partition; results are still joined in partition order.
    let outputs: Vec<_> = children.iter_mut().map(|c| c.stdout.take()).collect();
    let results: Vec<SweepResult<Vec<HistoryEntry>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = outputs
            .into_iter()
            .enumerate()
            .map(|(worker_idx, stdout)| {
                let relay = progress.cloned();
                scope.spawn(move || read_worker_stream(worker_idx, stdout, relay.as_ref()))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(SweepError::Internal("worker reader panicked".to_string()))
                })
            })
            .collect()
    });

    for child in &mut children {
        match child.wait() {
            Ok(status) if !status.success() => {
                warn!(%status, "worker exited abnormally");
            }
            Ok(_) => {}
            Err(e) => {
                return Err(WorkerError::Exited {
                    status: e.to_string(),
                }
                .into())
            }
        }
    }

    let mut entries = Vec::with_capacity(batch.len());
    for result in results {
        entries.extend(result?);
    }
    Ok(entries)
}

fn read_worker_stream(
    worker_idx: usize,
    stdout: Option<std::process::ChildStdout>,
    relay: Option<&ProgressRelay>,
) -> SweepResult<Vec<HistoryEntry>> {
    let stdout = stdout.ok_or_else(|| {
        SweepError::from(WorkerError::Protocol {
            message: "worker stdout unavailable".to_string(),
        })
    })?;

    let reader = BufReader::new(stdout);
    let mut entries: Option<Vec<HistoryEntry>> = None;

    for line in reader.lines() {
        let line = line.map_err(|e| WorkerError::Protocol {
            message: format!("failed to read worker stream: {e}"),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WorkerLine>(&line) {
            Ok(WorkerLine::Progress { completed, total }) => {
                if let Some(relay) = relay {
                    relay.send(ProgressEvent {
                        completed,
                        total,
                        worker: worker_idx,
                        objective: None,
                    });
                }
            }
            Ok(WorkerLine::Done { entries: e }) => entries = Some(e),
            Ok(WorkerLine::Error { message }) => {
                return Err(WorkerError::Remote { message }.into());
            }
            Err(e) => {
                return Err(WorkerError::Protocol {
                    message: format!("undecodable worker line: {e}"),
                }
                .into());
            }
        }
    }

    entries.ok_or_else(|| {
        SweepError::from(WorkerError::Protocol {
            message: "worker stream ended without a result".to_string(),
        })
    })
}
