// Exact brute-force index (the equivalent of a flat inner-product or L2 index).
//
// Scores every stored vector against the query in parallel and keeps the
// `k` nearest. Ties are broken by ascending id so results are deterministic.

use rayon::prelude::*;

use crate::config::Metric;
use crate::error::{CoreResult, RetrievalError};
use crate::index::VectorIndex;
use crate::model::record::VectorId;
use crate::vector;

/// In-memory exact index over row-major vectors.
#[derive(Clone, Debug)]
pub struct FlatIndex {
    metric: Metric,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(metric: Metric, dimension: usize) -> Self {
        Self {
            metric,
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Build an index from vectors in insertion order (position = id).
    ///
    /// # Errors
    ///
    /// `IndexUnavailable` if a vector has the wrong dimension, contains
    /// non-finite values, or (inner-product space) is not unit norm.
    pub fn from_vectors(
        metric: Metric,
        dimension: usize,
        vectors: Vec<Vec<f32>>,
    ) -> CoreResult<Self> {
        let mut index = Self::new(metric, dimension);
        for v in vectors {
            index.add(v)?;
        }
        Ok(index)
    }

    /// Append one vector and return its id.
    pub fn add(&mut self, v: Vec<f32>) -> CoreResult<VectorId> {
        let id = VectorId(self.vectors.len() as u64);
        if v.len() != self.dimension {
            return Err(RetrievalError::IndexUnavailable(format!(
                "vector {} has dimension {}, index expects {}",
                id,
                v.len(),
                self.dimension
            )));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(RetrievalError::IndexUnavailable(format!(
                "vector {} contains non-finite values",
                id
            )));
        }
        if self.metric == Metric::InnerProduct && !vector::is_unit(&v) {
            return Err(RetrievalError::IndexUnavailable(format!(
                "vector {} is not unit norm (norm = {}); inner-product indexes hold normalised vectors only",
                id,
                vector::l2_norm(&v)
            )));
        }
        self.vectors.push(v);
        Ok(id)
    }

    /// Stored vectors in id order.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        match self.metric {
            Metric::InnerProduct => vector::dot(query, stored),
            Metric::L2 => vector::euclidean(query, stored),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn search(&self, query: &[f32], k: usize) -> CoreResult<Vec<(VectorId, f32)>> {
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                what: "query",
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(VectorId, f32)> = self
            .vectors
            .par_iter()
            .enumerate()
            .map(|(i, v)| (VectorId(i as u64), self.score(query, v)))
            .collect();

        let metric = self.metric;
        scored.par_sort_unstable_by(|a, b| {
            metric.cmp_scores(a.1, b.1).then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn reconstruct(&self, id: VectorId) -> CoreResult<Vec<f32>> {
        self.vectors.get(id.0 as usize).cloned().ok_or_else(|| {
            RetrievalError::IndexUnavailable(format!(
                "vector id {} out of range (index holds {})",
                id,
                self.vectors.len()
            ))
        })
    }
}
