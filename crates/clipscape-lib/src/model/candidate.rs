use serde::{Deserialize, Serialize};

use crate::model::record::VectorId;

/// One nearest-neighbour hit, with its embedding reconstructed from the index.
///
/// Lives for a single retrieval call and is never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: VectorId,
    pub embedding: Vec<f32>,
    /// Inner product (higher is nearer) or Euclidean distance (lower is nearer),
    /// depending on the index metric.
    pub score: f32,
}
