/*
Diversifier: partition a candidate pool with seeded k-means and keep, for each
non-empty cluster, the candidate closest to that cluster's centroid.

Design notes:
- The effective cluster count is clamped to the number of candidates and to
  the number of distinct embeddings; k-means++ seeding cannot place more
  centroids than there are distinct points.
- The seed comes from `ClusteringConfig`, so identical pools always produce
  identical representatives.
- Clustering failure is never surfaced: the diversifier degrades to the single
  nearest candidate and logs a warning.
*/

use std::collections::HashSet;

use anyhow::Result;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::config::ClusteringConfig;
use crate::model::candidate::Candidate;
use crate::vector;

/// Pick at most `cluster_count` mutually distinct representatives from `candidates`.
///
/// # Arguments
///
/// * `candidates` - Pool to diversify, nearest-to-query first. All embeddings
///   must share one dimension.
/// * `cluster_count` - Upper bound on the number of representatives.
/// * `cfg` - Seed, tolerance, iteration cap and restart count for k-means.
///
/// # Returns
///
/// One candidate per non-empty cluster, ordered by cluster index. Never
/// contains the same candidate twice. Empty when `candidates` is empty;
/// exactly `[candidates[0]]` when there is a single candidate or clustering
/// fails.
pub fn diversify(
    candidates: &[Candidate],
    cluster_count: usize,
    cfg: &ClusteringConfig,
) -> Vec<Candidate> {
    if candidates.is_empty() || cluster_count == 0 {
        return Vec::new();
    }
    let k = effective_cluster_count(candidates, cluster_count);
    if candidates.len() < 2 {
        return vec![candidates[0].clone()];
    }

    let records = match assemble_embedding_matrix(candidates) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "diversify: falling back to nearest candidate");
            return vec![candidates[0].clone()];
        }
    };

    let clustered = if k == 1 {
        // One cluster: its centroid is the mean of the whole pool.
        single_cluster(&records)
    } else {
        run_kmeans(&records, k, cfg)
    };

    match clustered {
        Ok((labels, centroids)) => {
            let reps = pick_representatives(candidates, &labels, &centroids);
            debug!(
                pool = candidates.len(),
                requested = cluster_count,
                effective = k,
                representatives = reps.len(),
                "diversified candidate pool"
            );
            reps
        }
        Err(e) => {
            warn!(error = %e, k, "k-means failed; falling back to nearest candidate");
            vec![candidates[0].clone()]
        }
    }
}

fn single_cluster(records: &Array2<f32>) -> Result<(Array1<usize>, Array2<f32>)> {
    let mean = records
        .mean_axis(Axis(0))
        .ok_or_else(|| anyhow::anyhow!("cannot average an empty pool"))?;
    Ok((
        Array1::<usize>::zeros(records.nrows()),
        mean.insert_axis(Axis(0)),
    ))
}

/// `min(cluster_count, n, distinct embeddings)`.
fn effective_cluster_count(candidates: &[Candidate], cluster_count: usize) -> usize {
    let distinct: HashSet<Vec<u32>> = candidates
        .iter()
        .map(|c| {
            c.embedding
                .iter()
                // -0.0 and 0.0 are the same point.
                .map(|x| if *x == 0.0 { 0 } else { x.to_bits() })
                .collect()
        })
        .collect();
    cluster_count.min(candidates.len()).min(distinct.len())
}

/// Stack candidate embeddings into an `(n, dim)` matrix.
///
/// # Errors
///
/// Returns an error if embeddings disagree on dimension or contain
/// non-finite values.
pub fn assemble_embedding_matrix(candidates: &[Candidate]) -> Result<Array2<f32>> {
    let n = candidates.len();
    let dim = candidates.first().map(|c| c.embedding.len()).unwrap_or(0);
    let mut flat = Vec::with_capacity(n * dim);
    for c in candidates {
        if c.embedding.len() != dim {
            anyhow::bail!(
                "candidate {} has dimension {}, expected {}",
                c.id,
                c.embedding.len(),
                dim
            );
        }
        if c.embedding.iter().any(|x| !x.is_finite()) {
            anyhow::bail!("candidate {} has a non-finite component", c.id);
        }
        flat.extend_from_slice(&c.embedding);
    }
    Ok(Array2::from_shape_vec((n, dim), flat)?)
}

/// Run seeded k-means on the rows of `records`.
///
/// # Arguments
///
/// * `records` - `(n, dim)` matrix, one candidate per row.
/// * `k` - Number of clusters; must not exceed the number of distinct rows.
/// * `cfg` - Clustering parameters.
///
/// # Returns
///
/// Cluster label per row and the `(k, dim)` centroid matrix.
///
/// # Errors
///
/// Returns an error if the clustering algorithm fails.
pub fn run_kmeans(
    records: &Array2<f32>,
    k: usize,
    cfg: &ClusteringConfig,
) -> Result<(Array1<usize>, Array2<f32>)> {
    let dataset = linfa::DatasetBase::from(records.clone());
    let rng = StdRng::seed_from_u64(cfg.seed);
    let model = KMeans::params_with_rng(k, rng)
        .max_n_iterations(cfg.max_iterations)
        .tolerance(cfg.tolerance)
        .n_runs(cfg.n_runs)
        .fit(&dataset)?;
    let labels: Array1<usize> = model.predict(records);
    Ok((labels, model.centroids().to_owned()))
}

/// For each cluster that received at least one candidate, the member closest
/// to the centroid. Ties go to the earlier (nearer-to-query) candidate.
fn pick_representatives(
    candidates: &[Candidate],
    labels: &Array1<usize>,
    centroids: &Array2<f32>,
) -> Vec<Candidate> {
    let k = centroids.nrows();
    let mut best: Vec<Option<(usize, f32)>> = vec![None; k];
    for (i, &label) in labels.iter().enumerate() {
        if label >= k {
            continue;
        }
        let centroid = centroids.row(label).to_vec();
        let d = vector::euclidean(&candidates[i].embedding, &centroid);
        let closer = match best[label] {
            Some((_, bd)) => d < bd,
            None => true,
        };
        if closer {
            best[label] = Some((i, d));
        }
    }

    let mut seen = HashSet::new();
    best.into_iter()
        .flatten()
        .filter(|(i, _)| seen.insert(candidates[*i].id))
        .map(|(i, _)| candidates[i].clone())
        .collect()
}
