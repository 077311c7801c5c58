//! label-forge: active-learning sample selection for human labeling.
//!
//! This library scores an unlabeled pool with a trained classifier and picks
//! a diverse, informative batch of samples using BADGE, then stores the
//! selection as a JSON artifact.

pub mod cli;
pub mod diversity;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod storage;

// Re-export commonly used types
pub use diversity::{gradient_embeddings, BadgeSampler};
pub use error::{
    DataError, ErrorKind, ModelError, ModelLoadError, SelectionError, TaskError, TaskFailure,
};
pub use export::SelectionReport;
pub use pipeline::{SelectionConfig, SelectionContext, SelectionRequest, SelectionTask};
pub use pool::{Pool, PoolLoader, PoolSample};
