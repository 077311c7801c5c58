//! Error types for label-forge operations.
//!
//! Defines error types for each stage of a selection run:
//! - Pool assembly and model output validation (`DataError`)
//! - Diverse batch selection (`SelectionError`)
//! - Model retrieval and inference (`ModelLoadError`, `ModelError`)
//!
//! `TaskError` unifies them (plus configuration and storage failures) for
//! callers of the selection task, and `TaskFailure` is its structured,
//! serializable `(kind, message)` form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::config::ConfigError;
use crate::storage::StorageError;

/// Errors caused by the shape or content of pool data and model outputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("Pool is empty: no readable samples")]
    EmptyPool,

    #[error("Pool directory not found: {0}")]
    PoolNotFound(String),

    #[error("Probability matrix has no classes")]
    NoClasses,

    #[error("Invalid probability {value} at row {row}, class {class}")]
    InvalidProbability { row: usize, class: usize, value: f64 },

    #[error("Non-finite value in {what} at row {row}")]
    NonFinite { what: &'static str, row: usize },

    #[error("{what} dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} row count mismatch: expected {expected}, got {actual}")]
    RowCountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Sample at position {position} has index {index}")]
    OutOfOrderSample { position: usize, index: usize },

    #[error("Selected index {index} is out of range for pool of size {pool_size}")]
    IndexOutOfRange { index: usize, pool_size: usize },

    #[error("Selected index {0} appears more than once")]
    DuplicateIndex(usize),
}

/// Errors raised while choosing the diverse batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Cannot select from an empty pool")]
    EmptyPool,

    #[error("Requested {requested} samples but the pool only holds {pool_size}")]
    QueryExceedsPool { requested: usize, pool_size: usize },

    #[error("Diversity exhausted after {selected} of {requested} samples: all remaining points coincide with chosen centers")]
    DiversityExhausted { selected: usize, requested: usize },

    #[error("Squared distances overflow f64 after {selected} samples; rescale the embeddings")]
    WeightOverflow { selected: usize },
}

/// Errors raised when a model cannot be supplied for an experiment.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("No model directory for experiment '{0}'")]
    NotFound(String),

    #[error("No model artifact found in {0}")]
    NoArtifact(String),

    #[error("Invalid model artifact '{path}': {reason}")]
    Invalid { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a model adapter during inference.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Input width {actual} does not match model input width {expected}")]
    InputWidth { expected: usize, actual: usize },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Coarse failure category reported to task callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    ModelLoad,
    Data,
    Selection,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::ModelLoad => "model_load",
            ErrorKind::Data => "data",
            ErrorKind::Selection => "selection",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Any failure of a selection run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Model load error: {0}")]
    ModelLoad(#[from] ModelLoadError),

    #[error("Model inference error: {0}")]
    Model(#[from] ModelError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TaskError {
    /// Returns the failure category.
    ///
    /// Inference failures count as model-load failures: the adapter could not
    /// supply the capability the run needs. A pool whose input width does not
    /// fit the model is a data failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::Configuration(_) => ErrorKind::Configuration,
            TaskError::Model(ModelError::InputWidth { .. }) | TaskError::Data(_) => ErrorKind::Data,
            TaskError::ModelLoad(_) | TaskError::Model(_) => ErrorKind::ModelLoad,
            TaskError::Selection(_) => ErrorKind::Selection,
            TaskError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying the same run could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Storage(StorageError::Io(_)))
    }
}

/// Structured failure value returned to task callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TaskError> for TaskFailure {
    fn from(err: &TaskError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<TaskError> for TaskFailure {
    fn from(err: TaskError) -> Self {
        Self::from(&err)
    }
}
