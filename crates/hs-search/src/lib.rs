//! # hs-search
//!
//! Search scheduling and sweep orchestration for HyperSweep.
//!
//! Pulls candidate configurations from a pluggable [`SearchStrategy`],
//! dispatches their evaluation across one of three concurrency backends
//! (sequential, multi-thread, multi-process) with input-order preservation,
//! keeps an append-only history, buffers surplus candidates so generated
//! work is never dropped, and supports extending a finished sweep when the
//! budget grows.

pub mod backend;
pub mod buffer;
pub mod dispatch;
pub mod driver;
pub mod finalize;
pub mod progress;
pub mod resume;
pub mod run;
pub mod select;
pub mod strategy;
pub mod worker;

pub use backend::normalize_parallelism;
pub use buffer::SupplyBuffer;
pub use dispatch::dispatch_batch;
pub use driver::{search_loop, SearchCursor};
pub use finalize::{finalize, MetaState, SweepReport};
pub use progress::{ProgressEvent, ProgressRelay, ProgressStats, ProgressTracker};
pub use resume::{plan, ResumeDecision};
pub use run::{extend_sweep, run_sweep, RunState, SweepOutcome, SweepRun};
pub use select::{loss_curve, running_minimum, BestByMeasure, SelectionRule};
pub use strategy::{GridStrategy, RandomStrategy, SearchStrategy};
pub use worker::{run_worker, worker_mode_active, WorkerLine, WorkerRequest};
