//! Error types for Blog Writer.
//!
//! Library crates use [`BlogWriterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::{RunId, StepName};

/// Top-level error type for all Blog Writer operations.
#[derive(Debug, thiserror::Error)]
pub enum BlogWriterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error (or browser failure) while fetching source content.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Language-model adapter failure (auth, quota, network).
    #[error("model error: {0}")]
    Model(String),

    /// Image adapter failure. Absorbed by the image step, never fatal to a run.
    #[error("image error: {0}")]
    Image(String),

    /// Model output could not be parsed into the expected structure.
    /// Always recovered by a step-local fallback.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Run-state persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The run id is unknown, or the run can no longer be resumed.
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: RunId },

    /// Another resume is already in flight for this run id.
    #[error("run {run_id} is already being resumed")]
    RunBusy { run_id: RunId },

    /// A run with this id has already been started.
    #[error("run {run_id} already exists")]
    RunExists { run_id: RunId },

    /// A step tried to overwrite a state field written earlier in the run.
    #[error("state field '{field}' is already set")]
    StateConflict { field: &'static str },

    /// A pipeline step failed; wraps the underlying cause.
    #[error("step '{step}' failed in run {run_id}: {source}")]
    Step {
        step: StepName,
        run_id: RunId,
        source: Box<BlogWriterError>,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad URL, malformed run id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlogWriterError>;

impl BlogWriterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a step's failure with the step name and run id.
    pub fn step(step: StepName, run_id: RunId, source: BlogWriterError) -> Self {
        Self::Step {
            step,
            run_id,
            source: Box::new(source),
        }
    }

    /// The failing step, if this error came out of pipeline execution.
    pub fn failed_step(&self) -> Option<StepName> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
