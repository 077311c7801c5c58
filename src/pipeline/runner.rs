//! Selection task runner.
//!
//! This module provides the `SelectionTask` which combines model loading,
//! pool inference, gradient embedding and BADGE sampling, and persists the
//! resulting report exactly once at the end of a successful run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::config::{ConfigError, SelectionConfig};
use crate::diversity::{gradient_embeddings, BadgeSampler};
use crate::error::TaskError;
use crate::export::SelectionReport;
use crate::model::{infer_pool, ModelProvider};
use crate::pool::Pool;
use crate::storage::{validate_dataset_name, SelectionStore};

/// Arguments of one selection task invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// Experiment whose model scores the pool.
    pub experiment_name: String,
    /// Dataset the pool belongs to; the report is stored under this name.
    pub dataset_name: String,
    /// Samples to select; falls back to the configured query size.
    #[serde(default)]
    pub query_size: Option<usize>,
}

impl SelectionRequest {
    /// Creates a new request using the configured query size.
    pub fn new(experiment_name: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            dataset_name: dataset_name.into(),
            query_size: None,
        }
    }

    /// Sets the query size.
    pub fn with_query_size(mut self, query_size: usize) -> Self {
        self.query_size = Some(query_size);
        self
    }
}

/// Caller-owned state for one selection run.
///
/// Holds the random source used by the sampling draw. The caller creates it,
/// passes it to [`SelectionTask::run`], and drops it when the run is over;
/// nothing is looked up from process-wide state.
#[derive(Debug, Clone)]
pub struct SelectionContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    seed: Option<u64>,
    rng: ChaCha8Rng,
}

impl SelectionContext {
    /// Context with a reproducible random source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            seed: Some(seed),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Context seeded from the thread-local generator.
    pub fn from_entropy() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            seed: None,
            rng: ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Context for the seed in `config`, or from entropy when unset.
    pub fn for_config(config: &SelectionConfig) -> Self {
        match config.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Runs BADGE selection for a pool and stores the report.
pub struct SelectionTask {
    config: SelectionConfig,
    models: Arc<dyn ModelProvider>,
    store: Arc<dyn SelectionStore>,
}

impl SelectionTask {
    /// Creates a new selection task.
    pub fn new(
        config: SelectionConfig,
        models: Arc<dyn ModelProvider>,
        store: Arc<dyn SelectionStore>,
    ) -> Self {
        Self {
            config,
            models,
            store,
        }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Runs one selection.
    ///
    /// Returns the stored report. On any error nothing is persisted.
    ///
    /// # Errors
    ///
    /// - `TaskError::Configuration` for an invalid request or configuration
    /// - `TaskError::ModelLoad` / `TaskError::Model` if the model is unavailable
    /// - `TaskError::Data` for malformed model outputs
    /// - `TaskError::Selection` if the batch cannot be completed
    /// - `TaskError::Storage` if the report cannot be written
    pub async fn run(
        &self,
        request: &SelectionRequest,
        pool: &Pool,
        ctx: &mut SelectionContext,
    ) -> Result<SelectionReport, TaskError> {
        let started = Instant::now();
        let query_size = self.validate_request(request)?;

        info!(
            run_id = %ctx.run_id,
            experiment = %request.experiment_name,
            dataset = %request.dataset_name,
            pool_size = pool.len(),
            query_size,
            seed = ?ctx.seed(),
            "Starting selection run"
        );

        let model = self.models.load(&request.experiment_name)?;
        let outputs = infer_pool(model.as_ref(), pool, self.config.batch_size)?;
        let gradients = gradient_embeddings(outputs.probabilities.view())?;

        let num_samples = query_size.min(pool.len());
        if num_samples < query_size {
            warn!(
                requested = query_size,
                pool_size = pool.len(),
                "Query size exceeds pool; selecting the whole pool"
            );
        }

        let sampler = BadgeSampler::new(outputs.embeddings.view(), gradients.view())?;
        let indices = sampler.select(num_samples, ctx.rng())?;

        let report = SelectionReport::build(indices, &pool.names(), Utc::now())?;
        let path = self.store.save(&request.dataset_name, &report).await?;

        info!(
            run_id = %ctx.run_id,
            selected = report.len(),
            total = report.total,
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Selection run complete"
        );

        Ok(report)
    }

    fn validate_request(&self, request: &SelectionRequest) -> Result<usize, TaskError> {
        self.config.validate()?;

        if request.experiment_name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "experiment_name is required".to_string(),
            )
            .into());
        }

        validate_dataset_name(&request.dataset_name).map_err(|e| {
            TaskError::from(ConfigError::ValidationFailed(e.to_string()))
        })?;

        let query_size = request.query_size.unwrap_or(self.config.query_size);
        if query_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "query_size must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(query_size)
    }
}
