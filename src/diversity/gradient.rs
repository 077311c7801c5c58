//! Gradient embeddings from class probabilities.
//!
//! For a sample with probabilities `p` and pseudo-label `y = argmax(p)`, the
//! gradient of cross-entropy with respect to the output logits is `p - e_y`.
//! We store its negation, `e_y - p`; the sign does not affect any norm or
//! product the sampler uses.

use ndarray::{Array2, ArrayView2};

use crate::error::DataError;

/// Index of the largest probability in each row; ties go to the lowest class.
pub fn pseudo_labels(probs: ArrayView2<'_, f64>) -> Vec<usize> {
    probs
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (class, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = class;
                }
            }
            best
        })
        .collect()
}

/// Computes the `n × k` gradient embedding matrix.
///
/// # Errors
///
/// - `DataError::NoClasses` if the matrix has zero columns
/// - `DataError::InvalidProbability` for a negative or NaN entry
pub fn gradient_embeddings(probs: ArrayView2<'_, f64>) -> Result<Array2<f64>, DataError> {
    if probs.ncols() == 0 {
        return Err(DataError::NoClasses);
    }

    for ((row, class), &value) in probs.indexed_iter() {
        if value.is_nan() || value < 0.0 {
            return Err(DataError::InvalidProbability { row, class, value });
        }
    }

    let labels = pseudo_labels(probs);
    let mut grads = probs.mapv(|p| -p);
    for (row, label) in labels.into_iter().enumerate() {
        grads[[row, label]] += 1.0;
    }

    Ok(grads)
}
