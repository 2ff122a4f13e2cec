/*
Retrieval configuration: candidate pool size, cluster count, similarity metric
and the k-means parameters used by the diversifier.

Design notes:
- Defaults are the canonical live configuration: inner product over
  L2-normalised vectors, a pool of 100 candidates and 6 clusters.
- The clustering seed and tolerance are configuration, never hidden defaults
  inside the clustering call, so a given candidate set always yields the same
  representatives.
- Configuration is serde (de)serialisable so it can be loaded from JSON and
  echoed back in diagnostics.
*/

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, RetrievalError};

/// Default number of nearest neighbours fetched before diversification.
pub const DEFAULT_POOL_SIZE: usize = 100;
/// Default number of cluster representatives returned next to the best match.
pub const DEFAULT_CLUSTER_COUNT: usize = 6;
/// Default k-means seed.
pub const DEFAULT_SEED: u64 = 42;
/// Default k-means convergence tolerance.
pub const DEFAULT_TOLERANCE: f32 = 1e-4;
/// Default cap on Lloyd iterations per k-means run.
pub const DEFAULT_MAX_ITERATIONS: u64 = 300;
/// Default number of k-means restarts (best inertia wins).
pub const DEFAULT_N_RUNS: usize = 10;

/// Which vector space a search operates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Normalised space; score is the inner product, higher is nearer.
    InnerProduct,
    /// Raw space; score is the Euclidean distance, lower is nearer.
    L2,
}

impl Metric {
    /// Order two scores nearest-first.
    pub fn cmp_scores(self, a: f32, b: f32) -> std::cmp::Ordering {
        match self {
            Metric::InnerProduct => b.total_cmp(&a),
            Metric::L2 => a.total_cmp(&b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::InnerProduct => "inner_product",
            Metric::L2 => "l2",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for the seeded k-means run inside the diversifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub seed: u64,
    pub tolerance: f32,
    pub max_iterations: u64,
    pub n_runs: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            seed: DEFAULT_SEED,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            n_runs: DEFAULT_N_RUNS,
        }
    }
}

/// Configuration for one retrieval pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched from the index per query. Must exceed `cluster_count`.
    pub pool_size: usize,
    /// Maximum number of representatives returned.
    pub cluster_count: usize,
    /// Metric the loaded index must use.
    pub metric: Metric,
    pub clustering: ClusteringConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            pool_size: DEFAULT_POOL_SIZE,
            cluster_count: DEFAULT_CLUSTER_COUNT,
            metric: Metric::InnerProduct,
            clustering: ClusteringConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let file = File::open(path).map_err(|e| {
            RetrievalError::InvalidConfig(format!("opening {}: {}", path.display(), e))
        })?;
        let cfg: RetrievalConfig = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RetrievalError::InvalidConfig(format!("parsing {}: {}", path.display(), e))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.cluster_count == 0 {
            return Err(RetrievalError::InvalidConfig(
                "cluster_count must be at least 1".to_string(),
            ));
        }
        if self.pool_size <= self.cluster_count {
            return Err(RetrievalError::InvalidConfig(format!(
                "pool_size ({}) must be greater than cluster_count ({})",
                self.pool_size, self.cluster_count
            )));
        }
        let c = &self.clustering;
        if !(c.tolerance.is_finite() && c.tolerance > 0.0) {
            return Err(RetrievalError::InvalidConfig(format!(
                "clustering.tolerance must be positive (got {})",
                c.tolerance
            )));
        }
        if c.max_iterations == 0 || c.n_runs == 0 {
            return Err(RetrievalError::InvalidConfig(
                "clustering.max_iterations and clustering.n_runs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
