// Candidate retrieval: one wide nearest-neighbour query plus reconstruction
// of every hit's embedding (the clustering step needs the vectors, the search
// primitive only hands back ids and scores).

use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use crate::config::Metric;
use crate::error::{CoreResult, RetrievalError};
use crate::index::VectorIndex;
use crate::model::candidate::Candidate;
use crate::vector;

/// Fetch the `pool_size` nearest candidates to `query`, nearest first.
///
/// The query must match the index dimension and, in the inner-product space,
/// have unit norm. Hits are re-sorted nearest-first (ties by ascending id) and
/// de-duplicated so approximate backends cannot break the ordering contract.
///
/// # Errors
///
/// - `DimensionMismatch` / `NotNormalized` for an invalid query.
/// - `IndexUnavailable` if the index cannot be searched or reconstructed.
/// - `EmptyPool` if the search returns nothing.
pub fn retrieve(
    index: &dyn VectorIndex,
    query: &[f32],
    pool_size: usize,
) -> CoreResult<Vec<Candidate>> {
    let start = Instant::now();
    let metric = index.metric();

    if query.len() != index.dimension() {
        return Err(RetrievalError::DimensionMismatch {
            what: "query",
            expected: index.dimension(),
            actual: query.len(),
        });
    }
    if metric == Metric::InnerProduct && !vector::is_unit(query) {
        return Err(RetrievalError::NotNormalized {
            norm: vector::l2_norm(query),
        });
    }

    let mut hits = index.search(query, pool_size)?;
    hits.sort_by(|a, b| metric.cmp_scores(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
    let mut seen = HashSet::with_capacity(hits.len());
    hits.retain(|(id, _)| seen.insert(*id));
    hits.truncate(pool_size);

    if hits.is_empty() {
        return Err(RetrievalError::EmptyPool);
    }

    let candidates = hits
        .into_iter()
        .map(|(id, score)| {
            let embedding = index.reconstruct(id)?;
            if embedding.len() != index.dimension() {
                return Err(RetrievalError::IndexUnavailable(format!(
                    "reconstructed vector {} has dimension {}, expected {}",
                    id,
                    embedding.len(),
                    index.dimension()
                )));
            }
            Ok(Candidate {
                id,
                embedding,
                score,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    debug!(
        pool = candidates.len(),
        requested = pool_size,
        metric = %metric,
        elapsed = ?start.elapsed(),
        "retrieved candidate pool"
    );
    Ok(candidates)
}
