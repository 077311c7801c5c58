//! Diversity-based batch selection for active learning.
//!
//! Picks the pool samples most worth sending to a human labeler, following
//! BADGE (Batch Active learning by Diverse Gradient Embeddings):
//!
//! 1. **Gradients** - turn each sample's class probabilities into a
//!    pseudo-gradient of the loss with respect to the output logits, assuming
//!    the predicted class is correct. Confident samples get small gradients.
//! 2. **Sampling** - run k-means++ seeding over `embedding ⊗ gradient`, so the
//!    batch favours samples that are both uncertain (large gradient) and
//!    unlike the samples already chosen.
//!
//! # Usage
//!
//! ```rust,ignore
//! use label_forge::diversity::{gradient_embeddings, BadgeSampler};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let gradients = gradient_embeddings(probabilities.view())?;
//! let sampler = BadgeSampler::new(embeddings.view(), gradients.view())?;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let picked = sampler.select(100, &mut rng)?;
//! ```

pub mod gradient;
pub mod sampling;

pub use gradient::{gradient_embeddings, pseudo_labels};
pub use sampling::{factored_distance, BadgeSampler};
