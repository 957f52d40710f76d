//! # hs-types
//!
//! Core types and data structures for HyperSweep.
//!
//! Defines the shared vocabulary of the search scheduler: parameter values
//! and search spaces, candidates, the evaluation history, concurrency
//! backend selectors, the sweep configuration, and the error taxonomy.

pub mod backend;
pub mod candidate;
pub mod config;
pub mod errors;
pub mod history;
pub mod params;

pub use backend::{Backend, InnerParallelism, WorkerCommand};
pub use candidate::Candidate;
pub use config::SweepConfig;
pub use errors::{ConfigError, EvalError, SweepError, SweepResult, WorkerError};
pub use history::{History, HistoryEntry};
pub use params::{ParamDef, ParamKind, ParamMap, ParamSpace, ParamValue};
