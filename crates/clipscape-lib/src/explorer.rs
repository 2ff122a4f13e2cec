//! Process-wide entry point for diverse retrieval and embedding-space
//! navigation.
//!
//! An [`Explorer`] is built once at startup from an injected embedding
//! provider, an index/metadata [`Snapshot`] and a validated
//! [`RetrievalConfig`]. Every operation runs the same pipeline
//! (retrieve, diversify, assemble) on a query vector; they only differ in how
//! that vector is produced.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Metric, RetrievalConfig};
use crate::embed::EmbeddingProvider;
use crate::error::{CoreResult, RetrievalError};
use crate::index::VectorIndex;
use crate::metadata::MetadataStore;
use crate::model::record::{vector_id_to_row, MetadataRecord, RowId, VectorId};
use crate::model::result::RetrievalResult;
use crate::retrieval;
use crate::vector;

/// A vector index and the metadata store populated in the same order.
#[derive(Clone)]
pub struct Snapshot {
    pub index: Arc<dyn VectorIndex>,
    pub metadata: Arc<dyn MetadataStore>,
}

impl Snapshot {
    pub fn new(index: Arc<dyn VectorIndex>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { index, metadata }
    }
}

/// Summary of the loaded snapshot, for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub vectors: usize,
    pub dimension: usize,
    pub metric: Metric,
    pub model: String,
}

pub struct Explorer {
    provider: Arc<dyn EmbeddingProvider>,
    snapshot: RwLock<Arc<Snapshot>>,
    config: RetrievalConfig,
}

impl Explorer {
    /// Validate the collaborators against each other and build the explorer.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration is invalid, the index metric
    /// differs from the configured one, the index is empty, index and metadata
    /// sizes differ, metadata rows are not numbered `1..=len`, or the
    /// provider dimension differs from the index's.
    /// `MetadataUnavailable` if the store cannot be counted.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        snapshot: Snapshot,
        config: RetrievalConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        validate_snapshot(provider.as_ref(), &snapshot, &config)?;
        info!(
            vectors = snapshot.index.len(),
            dimension = snapshot.index.dimension(),
            metric = %config.metric,
            pool_size = config.pool_size,
            clusters = config.cluster_count,
            model = provider.model_name(),
            "explorer ready"
        );
        Ok(Self {
            provider,
            snapshot: RwLock::new(Arc::new(snapshot)),
            config,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The snapshot in use right now. Calls already running keep theirs.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn info(&self) -> SnapshotInfo {
        let snap = self.snapshot();
        SnapshotInfo {
            vectors: snap.index.len(),
            dimension: snap.index.dimension(),
            metric: snap.index.metric(),
            model: self.provider.model_name().to_string(),
        }
    }

    /// Embed `text` and return its diverse neighbourhood.
    pub fn search_by_text(&self, text: &str) -> CoreResult<RetrievalResult> {
        let raw = self.provider.embed_text(text)?;
        let query = self.prepare_embedding(raw)?;
        self.run("text", &query)
    }

    /// Embed an encoded image and return its diverse neighbourhood.
    pub fn search_by_image(&self, image: &[u8]) -> CoreResult<RetrievalResult> {
        let raw = self.provider.embed_image(image)?;
        let query = self.prepare_embedding(raw)?;
        self.run("image", &query)
    }

    /// Run the pipeline on a caller-supplied query vector.
    pub fn search_by_vector(&self, query: &[f32]) -> CoreResult<RetrievalResult> {
        self.run("vector", query)
    }

    /// Step from `current` along `direction` and search around the new point.
    ///
    /// In the inner-product space the new point is re-normalised; in the raw
    /// L2 space it is used as is.
    pub fn navigate(
        &self,
        current: &[f32],
        direction: &[f32],
        step_size: Option<f32>,
    ) -> CoreResult<RetrievalResult> {
        let snap = self.snapshot();
        let index = snap.index.as_ref();
        let next = retrieval::step_in(
            index.metric(),
            current,
            direction,
            step_size,
            index.dimension(),
        )?;
        self.run("navigate", &next)
    }

    /// Metadata for one vector id.
    pub fn record(&self, id: VectorId) -> CoreResult<MetadataRecord> {
        let row = vector_id_to_row(id);
        let snap = self.snapshot();
        let mut found = snap.metadata.get_many(&[row])?;
        found
            .remove(&row)
            .ok_or(RetrievalError::MetadataInconsistency { vector_id: id, row })
    }

    /// Swap in a new index/metadata pair after validating it.
    ///
    /// On error the current snapshot stays in place.
    pub fn reload(&self, snapshot: Snapshot) -> CoreResult<()> {
        validate_snapshot(self.provider.as_ref(), &snapshot, &self.config)?;
        let vectors = snapshot.index.len();
        *self.snapshot.write() = Arc::new(snapshot);
        info!(vectors, "snapshot reloaded");
        Ok(())
    }

    fn prepare_embedding(&self, raw: Vec<f32>) -> CoreResult<Vec<f32>> {
        match self.config.metric {
            Metric::InnerProduct => vector::normalized(&raw).ok_or_else(|| {
                RetrievalError::Embedding("provider returned a zero vector".to_string())
            }),
            Metric::L2 => Ok(raw),
        }
    }

    fn run(&self, source: &'static str, query: &[f32]) -> CoreResult<RetrievalResult> {
        let start = Instant::now();
        let snap = self.snapshot();
        let result = match retrieval::run(
            snap.index.as_ref(),
            snap.metadata.as_ref(),
            query,
            &self.config,
        ) {
            Ok(result) => result,
            Err(RetrievalError::EmptyPool) => {
                debug!(source, "empty candidate pool");
                RetrievalResult::empty()
            }
            Err(e) => return Err(e),
        };
        debug!(
            source,
            entries = result.len(),
            elapsed = ?start.elapsed(),
            "query served"
        );
        Ok(result)
    }
}

fn validate_snapshot(
    provider: &dyn EmbeddingProvider,
    snapshot: &Snapshot,
    config: &RetrievalConfig,
) -> CoreResult<()> {
    let index = snapshot.index.as_ref();
    if index.metric() != config.metric {
        return Err(RetrievalError::InvalidConfig(format!(
            "index metric is {}, configuration expects {}",
            index.metric(),
            config.metric
        )));
    }
    if index.is_empty() {
        return Err(RetrievalError::InvalidConfig(
            "vector index is empty".to_string(),
        ));
    }
    let rows = snapshot.metadata.len()?;
    if rows != index.len() {
        return Err(RetrievalError::InvalidConfig(format!(
            "index holds {} vectors but metadata store has {} rows",
            index.len(),
            rows
        )));
    }
    // Vector i must sit at row i + 1: rows 1..=len with no gaps.
    let range = snapshot.metadata.row_range()?;
    let expected_last = RowId(i64::try_from(rows).unwrap_or(i64::MAX));
    if range != Some((RowId(1), expected_last)) {
        let found = range.map_or_else(
            || "no rows".to_string(),
            |(first, last)| format!("{}..={}", first, last),
        );
        return Err(RetrievalError::InvalidConfig(format!(
            "metadata rows must be numbered 1..={}, found {}",
            rows, found
        )));
    }
    if provider.dimension() != index.dimension() {
        return Err(RetrievalError::InvalidConfig(format!(
            "embedding dimension {} does not match index dimension {}",
            provider.dimension(),
            index.dimension()
        )));
    }
    Ok(())
}
