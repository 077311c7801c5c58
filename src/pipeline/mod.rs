//! Selection pipeline: configuration, task metadata and the task runner.
//!
//! # Pipeline Flow
//!
//! 1. **Model Loading**: The experiment's model is resolved through a `ModelProvider`
//! 2. **Inference**: Probabilities and embeddings are computed batch by batch, in pool order
//! 3. **Gradient Embedding**: Probabilities become pseudo-label gradients
//! 4. **Selection**: BADGE picks a diverse, informative batch using the caller's rng
//! 5. **Report**: Indices are mapped to names from the same pool
//! 6. **Storage**: The report is written once, atomically
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use label_forge::model::DirectoryModelRegistry;
//! use label_forge::pipeline::{SelectionConfig, SelectionContext, SelectionRequest, SelectionTask};
//! use label_forge::pool::PoolLoader;
//! use label_forge::storage::FsSelectionStore;
//!
//! let config = SelectionConfig::from_env()?.with_seed(42);
//! let task = SelectionTask::new(
//!     config.clone(),
//!     Arc::new(DirectoryModelRegistry::new(&config.model_root)),
//!     Arc::new(FsSelectionStore::new(&config.output_dir)),
//! );
//!
//! let pool = PoolLoader::new("./pool").load()?;
//! let mut ctx = SelectionContext::for_config(&config);
//! let request = SelectionRequest::new("emotion-classifier", "faces").with_query_size(50);
//! let report = task.run(&request, &pool, &mut ctx).await?;
//! ```

pub mod config;
pub mod descriptor;
pub mod runner;

pub use config::{ConfigError, SelectionConfig, DEFAULT_BATCH_SIZE, DEFAULT_QUERY_SIZE};
pub use descriptor::{ArgumentSpec, DatasetSpec, TaskDescriptor};
pub use runner::{SelectionContext, SelectionRequest, SelectionTask};
