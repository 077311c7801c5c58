//! Model adapter contract and batched pool inference.
//!
//! The selection core never inspects a model's internals. A model is anything
//! that implements [`EmbeddingModel`]: it exposes a probability head and an
//! embedding head directly, both batched and row-aligned with their input.
//!
//! # Components
//!
//! - [`EmbeddingModel`] - the two-head inference contract
//! - [`ModelProvider`] - resolves an experiment name to a model
//! - [`DirectoryModelRegistry`] - provider backed by a directory of model files
//! - [`DenseSoftmaxModel`] - reference dense classifier adapter
//! - [`infer_pool`] - runs both heads over a whole pool in order

mod dense;
mod registry;

pub use dense::{Activation, DenseLayer, DenseSoftmaxModel};
pub use registry::{DirectoryModelRegistry, ModelProvider};

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use tracing::{debug, info};

use crate::error::{DataError, ModelError, TaskError};
use crate::pool::Pool;

/// A trained classifier exposing a probability head and an embedding head.
///
/// Both methods receive a batch of preprocessed inputs (one row per sample)
/// and must return exactly one output row per input row, in the same order.
/// Inference is stateless per sample, so batch boundaries never change the
/// values returned.
pub trait EmbeddingModel: Send + Sync {
    /// Human-readable identifier used in logs.
    fn name(&self) -> &str;

    /// Class-probability vectors, `n × k`.
    fn predict_probabilities(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError>;

    /// Representation-layer vectors, `n × d`.
    fn predict_embeddings(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError>;
}

/// Probability and embedding matrices for a whole pool, widened to `f64`.
#[derive(Debug, Clone)]
pub struct PoolOutputs {
    /// `n × k` class probabilities.
    pub probabilities: Array2<f64>,
    /// `n × d` embeddings.
    pub embeddings: Array2<f64>,
}

impl PoolOutputs {
    pub fn num_samples(&self) -> usize {
        self.probabilities.nrows()
    }

    pub fn num_classes(&self) -> usize {
        self.probabilities.ncols()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embeddings.ncols()
    }
}

/// Runs both heads of `model` over the pool, `batch_size` samples at a time.
///
/// Batches are processed strictly in pool order and concatenated, so row `i`
/// of each output matrix belongs to pool sample `i`.
///
/// # Errors
///
/// - `TaskError::Model` if the adapter fails on a batch
/// - `DataError::RowCountMismatch` if a head returns the wrong number of rows
/// - `DataError::DimensionMismatch` if a head changes width between batches
pub fn infer_pool(
    model: &dyn EmbeddingModel,
    pool: &Pool,
    batch_size: usize,
) -> Result<PoolOutputs, TaskError> {
    let batch_size = batch_size.max(1);
    let mut prob_batches: Vec<Array2<f32>> = Vec::new();
    let mut emb_batches: Vec<Array2<f32>> = Vec::new();

    info!(
        model = model.name(),
        samples = pool.len(),
        batch_size,
        "Running pool inference"
    );

    let mut start = 0;
    while start < pool.len() {
        let end = (start + batch_size).min(pool.len());
        let batch = pool.batch(start, end);
        let rows = batch.nrows();

        let probs = model.predict_probabilities(batch.view())?;
        check_batch("probability", &probs, rows, prob_batches.first())?;

        let embs = model.predict_embeddings(batch.view())?;
        check_batch("embedding", &embs, rows, emb_batches.first())?;

        debug!(start, end, "Inference batch complete");
        prob_batches.push(probs);
        emb_batches.push(embs);
        start = end;
    }

    Ok(PoolOutputs {
        probabilities: stack_rows(&prob_batches)?.mapv(f64::from),
        embeddings: stack_rows(&emb_batches)?.mapv(f64::from),
    })
}

fn check_batch(
    what: &'static str,
    output: &Array2<f32>,
    expected_rows: usize,
    first: Option<&Array2<f32>>,
) -> Result<(), DataError> {
    if output.nrows() != expected_rows {
        return Err(DataError::RowCountMismatch {
            what,
            expected: expected_rows,
            actual: output.nrows(),
        });
    }
    if let Some(first) = first {
        if output.ncols() != first.ncols() {
            return Err(DataError::DimensionMismatch {
                what,
                expected: first.ncols(),
                actual: output.ncols(),
            });
        }
    }
    Ok(())
}

fn stack_rows(batches: &[Array2<f32>]) -> Result<Array2<f32>, DataError> {
    if batches.is_empty() {
        return Err(DataError::EmptyPool);
    }
    let expected = batches[0].ncols();
    let views: Vec<ArrayView2<'_, f32>> = batches.iter().map(|b| b.view()).collect();
    concatenate(Axis(0), &views).map_err(|_| DataError::DimensionMismatch {
        what: "stacked output",
        expected,
        actual: batches
            .iter()
            .map(|b| b.ncols())
            .find(|&cols| cols != expected)
            .unwrap_or(expected),
    })
}
