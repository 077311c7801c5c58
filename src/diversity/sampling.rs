//! BADGE batch selection.
//!
//! Each pool sample is conceptually the outer product of its embedding and
//! its gradient embedding, a `d·k` vector. Selection runs k-means++ seeding
//! (D²-sampling) over those points without ever building them: for
//! `x_i = e_i ⊗ g_i`,
//!
//! ```text
//! ||x_i||²  = ||e_i||² · ||g_i||²
//! x_i · x_j = (e_i · e_j) · (g_i · g_j)
//! ```
//!
//! so every distance needs only per-sample norms and two dot products.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::RngExt;
use tracing::{debug, info};

use crate::error::{DataError, SelectionError};

/// Euclidean distance between two factored points from their norms and dot products.
///
/// Negative squared distances produced by floating-point cancellation are
/// clipped to zero before the square root.
pub fn factored_distance(
    norm_e_i: f64,
    norm_g_i: f64,
    norm_e_j: f64,
    norm_g_j: f64,
    e_dot: f64,
    g_dot: f64,
) -> f64 {
    let squared = norm_e_i * norm_g_i + norm_e_j * norm_g_j - 2.0 * e_dot * g_dot;
    squared.max(0.0).sqrt()
}

/// D²-sampler over the factored embedding ⊗ gradient space.
///
/// Holds borrowed views of the `n × d` embedding and `n × k` gradient
/// matrices plus their precomputed squared row norms. All arithmetic is `f64`.
#[derive(Debug, Clone)]
pub struct BadgeSampler<'a> {
    embeddings: ArrayView2<'a, f64>,
    gradients: ArrayView2<'a, f64>,
    emb_norms: Array1<f64>,
    grad_norms: Array1<f64>,
}

impl<'a> BadgeSampler<'a> {
    /// Prepares a sampler for one pool.
    ///
    /// # Errors
    ///
    /// - `DataError::RowCountMismatch` if the matrices describe different pools
    /// - `DataError::NonFinite` if any entry is NaN or infinite, or if a
    ///   sample's factored norm overflows
    pub fn new(
        embeddings: ArrayView2<'a, f64>,
        gradients: ArrayView2<'a, f64>,
    ) -> Result<Self, DataError> {
        if embeddings.nrows() != gradients.nrows() {
            return Err(DataError::RowCountMismatch {
                what: "gradient",
                expected: embeddings.nrows(),
                actual: gradients.nrows(),
            });
        }
        check_finite("embedding", embeddings)?;
        check_finite("gradient", gradients)?;

        let emb_norms = embeddings.map_axis(Axis(1), |row| row.dot(&row));
        let grad_norms = gradients.map_axis(Axis(1), |row| row.dot(&row));
        for (row, (e, g)) in emb_norms.iter().zip(grad_norms.iter()).enumerate() {
            if !(e * g).is_finite() {
                return Err(DataError::NonFinite { what: "norm", row });
            }
        }

        Ok(Self {
            embeddings,
            gradients,
            emb_norms,
            grad_norms,
        })
    }

    /// Number of pool samples.
    pub fn len(&self) -> usize {
        self.embeddings.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Squared norm of sample `i` in the factored space.
    pub fn squared_norm(&self, i: usize) -> f64 {
        self.emb_norms[i] * self.grad_norms[i]
    }

    /// Distance between samples `i` and `j` in the factored space.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        let e_dot = self.embeddings.row(i).dot(&self.embeddings.row(j));
        let g_dot = self.gradients.row(i).dot(&self.gradients.row(j));
        factored_distance(
            self.emb_norms[i],
            self.grad_norms[i],
            self.emb_norms[j],
            self.grad_norms[j],
            e_dot,
            g_dot,
        )
    }

    /// The sample farthest from the origin; lowest index wins ties.
    pub fn first_center(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.len() {
            let norm = self.squared_norm(i);
            match best {
                Some((_, best_norm)) if norm <= best_norm => {}
                _ => best = Some((i, norm)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Distances from every sample to `center`.
    fn distances_to(&self, center: usize) -> Array1<f64> {
        let e_dots = self.embeddings.dot(&self.embeddings.row(center));
        let g_dots = self.gradients.dot(&self.gradients.row(center));
        let center_e = self.emb_norms[center];
        let center_g = self.grad_norms[center];

        Array1::from_shape_fn(self.len(), |i| {
            factored_distance(
                self.emb_norms[i],
                self.grad_norms[i],
                center_e,
                center_g,
                e_dots[i],
                g_dots[i],
            )
        })
    }

    /// Selects `num_samples` distinct indices, most informative first.
    ///
    /// The first index is deterministic ([`Self::first_center`]); every later
    /// index is drawn from `rng` with probability proportional to its squared
    /// distance to the nearest index already chosen.
    ///
    /// # Errors
    ///
    /// - `SelectionError::EmptyPool` if there are no samples
    /// - `SelectionError::QueryExceedsPool` if `num_samples > len()`
    /// - `SelectionError::DiversityExhausted` if every unchosen sample
    ///   coincides with a chosen one before `num_samples` are picked
    /// - `SelectionError::WeightOverflow` if the squared distances sum past
    ///   the `f64` range
    pub fn select<R: RngExt>(
        &self,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, SelectionError> {
        let pool_size = self.len();
        if pool_size == 0 {
            return Err(SelectionError::EmptyPool);
        }
        if num_samples > pool_size {
            return Err(SelectionError::QueryExceedsPool {
                requested: num_samples,
                pool_size,
            });
        }
        if num_samples == 0 {
            return Ok(Vec::new());
        }

        let mut chosen = vec![false; pool_size];
        let mut order: Vec<usize> = Vec::with_capacity(num_samples);

        let first = self.first_center().ok_or(SelectionError::EmptyPool)?;
        let mut dist = self.distances_to(first);
        dist[first] = 0.0;
        chosen[first] = true;
        order.push(first);
        debug!(index = first, norm = self.squared_norm(first), "Seeded first center");

        while order.len() < num_samples {
            let last = order[order.len() - 1];
            let to_last = self.distances_to(last);
            dist.zip_mut_with(&to_last, |d, &new| *d = d.min(new));
            for &idx in &order {
                dist[idx] = 0.0;
            }

            let weights = dist.mapv(|d| d * d);
            let total = weights.sum();
            if !total.is_finite() {
                return Err(SelectionError::WeightOverflow {
                    selected: order.len(),
                });
            }
            if total <= 0.0 {
                return Err(SelectionError::DiversityExhausted {
                    selected: order.len(),
                    requested: num_samples,
                });
            }

            // Chosen samples carry zero weight; the retry only guards against residue.
            let mut pick = draw_weighted(weights.view(), total, rng);
            while chosen[pick] {
                pick = draw_weighted(weights.view(), total, rng);
            }

            debug!(
                index = pick,
                distance = dist[pick],
                selected = order.len() + 1,
                "Selected sample"
            );
            chosen[pick] = true;
            order.push(pick);
        }

        info!(selected = order.len(), pool_size, "BADGE selection complete");
        Ok(order)
    }
}

/// Draws an index with probability `weights[i] / total`.
fn draw_weighted<R: RngExt>(weights: ArrayView1<'_, f64>, total: f64, rng: &mut R) -> usize {
    let roll: f64 = rng.random_range(0.0..total);

    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = i;
        if roll < cumulative {
            return i;
        }
    }

    last_positive
}

fn check_finite(what: &'static str, matrix: ArrayView2<'_, f64>) -> Result<(), DataError> {
    for (row, values) in matrix.rows().into_iter().enumerate() {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DataError::NonFinite { what, row });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diversity::gradient::gradient_embeddings;
    use ndarray::{array, Array2};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    /// Four samples, two classes, pseudo-labels [0, 1, 0, 1].
    fn four_sample_pool() -> (Array2<f64>, Array2<f64>) {
        let embeddings = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]];
        let probs = array![[0.9, 0.1], [0.2, 0.8], [0.6, 0.4], [0.3, 0.7]];
        let gradients = gradient_embeddings(probs.view()).unwrap();
        (embeddings, gradients)
    }

    fn random_pool(n: usize, d: usize, k: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let embeddings = Array2::from_shape_fn((n, d), |_| rng.random_range(-1.0..1.0));
        let mut probs = Array2::from_shape_fn((n, k), |_| rng.random_range(0.01..1.0));
        for mut row in probs.rows_mut() {
            let sum = row.sum();
            row.mapv_inplace(|p| p / sum);
        }
        let gradients = gradient_embeddings(probs.view()).unwrap();
        (embeddings, gradients)
    }

    #[test]
    fn test_first_pick_is_largest_norm_product() {
        let (embs, grads) = four_sample_pool();
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        // norm products: 0.02, 0.08, 0.64, 0.0
        assert!((sampler.squared_norm(2) - 0.64).abs() < 1e-12);
        assert_eq!(sampler.first_center(), Some(2));
    }

    #[test]
    fn test_four_sample_selection() {
        let (embs, grads) = four_sample_pool();
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = sampler.select(2, &mut rng).unwrap();

            assert_eq!(picked.len(), 2);
            assert_eq!(picked[0], 2);
            assert_ne!(picked[1], picked[0]);
            assert!(sampler.distance(picked[1], picked[0]) > 0.0);
        }
    }

    #[test]
    fn test_hand_computed_distances() {
        let (embs, grads) = four_sample_pool();
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        assert!((sampler.distance(0, 2) - 0.50_f64.sqrt()).abs() < 1e-12);
        assert!((sampler.distance(1, 2) - 1.04_f64.sqrt()).abs() < 1e-12);
        assert!((sampler.distance(3, 2) - 0.64_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let (embs, grads) = random_pool(30, 8, 4, 7);
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        for i in 0..sampler.len() {
            assert_eq!(sampler.distance(i, i), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let (embs, grads) = random_pool(25, 6, 3, 11);
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        for i in 0..sampler.len() {
            for j in 0..sampler.len() {
                assert!((sampler.distance(i, j) - sampler.distance(j, i)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_closed_form_matches_explicit_outer_product() {
        let (embs, grads) = random_pool(6, 3, 4, 5);
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        let outer = |i: usize| -> Vec<f64> {
            let mut v = Vec::new();
            for e in embs.row(i) {
                for g in grads.row(i) {
                    v.push(e * g);
                }
            }
            v
        };

        for i in 0..6 {
            for j in 0..6 {
                let explicit: f64 = outer(i)
                    .iter()
                    .zip(outer(j).iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                assert!((sampler.distance(i, j) - explicit).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_selected_indices_are_distinct() {
        let (embs, grads) = random_pool(60, 10, 5, 3);
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let picked = sampler.select(25, &mut rng).unwrap();
        let unique: HashSet<_> = picked.iter().copied().collect();

        assert_eq!(picked.len(), 25);
        assert_eq!(unique.len(), 25);
        assert_eq!(picked[0], sampler.first_center().unwrap());
    }

    #[test]
    fn test_full_coverage() {
        for n in 1..=12 {
            let (embs, grads) = random_pool(n, 4, 3, n as u64);
            let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(9);

            let mut picked = sampler.select(n, &mut rng).unwrap();
            picked.sort_unstable();
            assert_eq!(picked, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_same_seed_same_selection() {
        let (embs, grads) = random_pool(40, 5, 3, 21);
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();

        let a = sampler
            .select(15, &mut ChaCha8Rng::seed_from_u64(1234))
            .unwrap();
        let b = sampler
            .select(15, &mut ChaCha8Rng::seed_from_u64(1234))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_samples() {
        let (embs, grads) = four_sample_pool();
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(sampler.select(0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_query_exceeds_pool() {
        let (embs, grads) = four_sample_pool();
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            sampler.select(10, &mut rng).unwrap_err(),
            SelectionError::QueryExceedsPool {
                requested: 10,
                pool_size: 4
            }
        );
    }

    #[test]
    fn test_empty_pool() {
        let embs = Array2::<f64>::zeros((0, 3));
        let grads = Array2::<f64>::zeros((0, 2));
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            sampler.select(1, &mut rng).unwrap_err(),
            SelectionError::EmptyPool
        );
    }

    #[test]
    fn test_identical_points_exhaust_diversity() {
        let embs = array![[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
        let grads = array![[0.4, -0.4], [0.4, -0.4], [0.4, -0.4]];
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            sampler.select(2, &mut rng).unwrap_err(),
            SelectionError::DiversityExhausted {
                selected: 1,
                requested: 2
            }
        );
    }

    #[test]
    fn test_single_sample_pool() {
        let embs = array![[0.0, 0.0]];
        let grads = array![[0.0, 0.0]];
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(sampler.select(1, &mut rng).unwrap(), vec![0]);
    }

    #[test]
    fn test_row_mismatch() {
        let embs = array![[1.0], [2.0]];
        let grads = array![[0.5, -0.5]];
        let err = BadgeSampler::new(embs.view(), grads.view()).unwrap_err();
        assert!(matches!(err, DataError::RowCountMismatch { .. }));
    }

    #[test]
    fn test_rejects_non_finite() {
        let embs = array![[1.0], [f64::INFINITY]];
        let grads = array![[0.5, -0.5], [0.1, -0.1]];
        let err = BadgeSampler::new(embs.view(), grads.view()).unwrap_err();
        assert_eq!(
            err,
            DataError::NonFinite {
                what: "embedding",
                row: 1
            }
        );
    }

    #[test]
    fn test_rejects_overflowing_norms() {
        let embs = array![[1e200, 0.0], [0.0, 1e200]];
        let grads = array![[0.5, -0.5], [-0.5, 0.5]];
        let err = BadgeSampler::new(embs.view(), grads.view()).unwrap_err();
        assert_eq!(err, DataError::NonFinite { what: "norm", row: 0 });
    }

    #[test]
    fn test_overflowing_weights_are_an_error() {
        // Norm products stay finite, but squared distances do not.
        let embs = array![[1e150, 0.0], [-1e150, 0.0]];
        let grads = array![[7e3, -7e3], [7e3, -7e3]];
        let sampler = BadgeSampler::new(embs.view(), grads.view()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            sampler.select(2, &mut rng).unwrap_err(),
            SelectionError::WeightOverflow { selected: 1 }
        );
    }

    #[test]
    fn test_draw_never_picks_zero_weight() {
        let weights = array![0.0, 3.0, 0.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        for _ in 0..500 {
            let pick = draw_weighted(weights.view(), 4.0, &mut rng);
            assert!(pick == 1 || pick == 3);
        }
    }
}
