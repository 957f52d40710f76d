//! Error taxonomy for HyperSweep.

use thiserror::Error;

/// Main error type for the HyperSweep system.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration problems, detected eagerly at validation time — never
/// deferred to search time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No generation range supplied: the search space is empty")]
    EmptySpace,

    #[error("Sweep name must not be empty")]
    EmptyName,

    #[error("Backend requires at least one worker, got {workers}")]
    NoWorkers { workers: usize },

    #[error("Invalid parameter bound for {name}: low {low} >= high {high}")]
    InvalidBound { name: String, low: f64, high: f64 },

    #[error("Choice parameter {name} has no values")]
    EmptyChoice { name: String },

    #[error("Unknown measure: {name}")]
    UnknownMeasure { name: String },
}

/// A candidate failed to fit or be scored.
///
/// Fatal to the enclosing batch and thus to the whole search invocation; no
/// partial entry is ever recorded for a failed candidate.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Model fit failed: {message}")]
    Fit { message: String },

    #[error("Resampling plan is degenerate: {message}")]
    Degenerate { message: String },

    #[error("Missing parameter value: {name}")]
    MissingParam { name: String },
}

/// Process-backend failures: spawning, wire protocol, worker exit.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {message}")]
    Spawn { message: String },

    #[error("Worker protocol violation: {message}")]
    Protocol { message: String },

    #[error("Worker reported failure: {message}")]
    Remote { message: String },

    #[error("Worker exited abnormally (status: {status})")]
    Exited { status: String },
}

/// Result type alias for HyperSweep operations.
pub type SweepResult<T> = Result<T, SweepError>;
