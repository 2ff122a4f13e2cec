//! Vector index boundary.
//!
//! The retrieval core treats nearest-neighbour search as a black box behind
//! [`VectorIndex`]. [`FlatIndex`] is the bundled exact implementation.

mod flat;

pub use flat::FlatIndex;

use crate::config::Metric;
use crate::error::CoreResult;
use crate::model::record::VectorId;

/// Nearest-neighbour search over embeddings identified by dense zero-based ids.
pub trait VectorIndex: Send + Sync {
    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Number of stored vectors; ids are `0..len()`.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Space this index searches in.
    fn metric(&self) -> Metric;

    /// Up to `k` `(id, score)` pairs, nearest first.
    fn search(&self, query: &[f32], k: usize) -> CoreResult<Vec<(VectorId, f32)>>;

    /// The stored embedding for `id`.
    fn reconstruct(&self, id: VectorId) -> CoreResult<Vec<f32>>;
}
