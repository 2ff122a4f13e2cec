// Response payload returned to callers.
//
// Field names follow the wire shape consumed by the explorer front end:
// `best_match` / `clusters`, each entry with `index`, `embeddings` and
// `metadata { id, url, desc }`.

use serde::{Deserialize, Serialize};

use crate::model::record::{MetadataRecord, VectorId};

/// A candidate joined to its metadata record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "index")]
    pub id: VectorId,
    #[serde(rename = "embeddings")]
    pub embedding: Vec<f32>,
    pub score: f32,
    pub metadata: MetadataRecord,
}

/// Best match plus cluster representatives, in cluster order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// `None` only when the candidate pool was empty.
    pub best_match: Option<ResultEntry>,
    pub clusters: Vec<ResultEntry>,
}

impl RetrievalResult {
    /// Result for a query whose candidate pool came back empty.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.best_match.is_none()
    }

    /// Number of entries, best match included.
    pub fn len(&self) -> usize {
        self.clusters.len() + usize::from(self.best_match.is_some())
    }

    /// Entries in response order: best match first, then representatives.
    pub fn entries(&self) -> impl Iterator<Item = &ResultEntry> {
        self.best_match.iter().chain(self.clusters.iter())
    }
}
