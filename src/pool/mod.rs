//! Unlabeled candidate pool.
//!
//! A [`Pool`] is the ordered list of samples a selection run draws from. Its
//! ordering is the single source of truth for the index → name mapping: the
//! same `Pool` value feeds inference and the final selection report, so names
//! can never drift from the rows they label.

mod loader;

pub use loader::PoolLoader;

use ndarray::Array2;

use crate::error::DataError;

/// One candidate sample: stable index, display name, preprocessed input.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSample {
    pub index: usize,
    pub name: String,
    pub input: Vec<f32>,
}

impl PoolSample {
    pub fn new(index: usize, name: impl Into<String>, input: Vec<f32>) -> Self {
        Self {
            index,
            name: name.into(),
            input,
        }
    }
}

/// Ordered, immutable pool of candidate samples.
#[derive(Debug, Clone)]
pub struct Pool {
    samples: Vec<PoolSample>,
    input_dim: usize,
}

impl Pool {
    /// Builds a pool from samples already in pool order.
    ///
    /// Sample `i` must carry index `i`, and every input must have the same
    /// width.
    ///
    /// # Errors
    ///
    /// - `DataError::EmptyPool` if `samples` is empty
    /// - `DataError::OutOfOrderSample` if an index does not match its position
    /// - `DataError::DimensionMismatch` if input widths differ
    pub fn from_samples(samples: Vec<PoolSample>) -> Result<Self, DataError> {
        let first = samples.first().ok_or(DataError::EmptyPool)?;
        let input_dim = first.input.len();

        for (position, sample) in samples.iter().enumerate() {
            if sample.index != position {
                return Err(DataError::OutOfOrderSample {
                    position,
                    index: sample.index,
                });
            }
            if sample.input.len() != input_dim {
                return Err(DataError::DimensionMismatch {
                    what: "pool input",
                    expected: input_dim,
                    actual: sample.input.len(),
                });
            }
        }

        Ok(Self { samples, input_dim })
    }

    /// Number of samples in the pool.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// A constructed pool is never empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Width of every sample's input vector.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn samples(&self) -> &[PoolSample] {
        &self.samples
    }

    /// Sample names in pool order.
    pub fn names(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.name.clone()).collect()
    }

    /// Packs the inputs of `samples[start..end]` into a row-major batch.
    pub fn batch(&self, start: usize, end: usize) -> Array2<f32> {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        let rows = end - start;

        let mut batch = Array2::zeros((rows, self.input_dim));
        for (row, sample) in self.samples[start..end].iter().enumerate() {
            for (col, value) in sample.input.iter().enumerate() {
                batch[[row, col]] = *value;
            }
        }
        batch
    }
}
