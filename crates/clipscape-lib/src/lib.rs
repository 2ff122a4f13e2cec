//! Library entry point for clipscape: diverse nearest-neighbour retrieval and
//! embedding-space navigation over CLIP-style image embeddings.
//!
//! This file re-exports the core types and provides helpers to persist and
//! restore a [`FlatIndex`] snapshot to/from JSON.
//
// Public modules
pub mod config;
pub mod embed;
pub mod error;
pub mod explorer;
pub mod index;
pub mod metadata;
pub mod model;
pub mod retrieval;
pub mod utils;
pub mod vector;

// Re-export primary types for ergonomic use.
pub use config::{ClusteringConfig, Metric, RetrievalConfig};
pub use embed::{EmbeddingProvider, HashEmbedder};
pub use error::{CoreResult, ErrorKind, ErrorResponse, RetrievalError};
pub use explorer::{Explorer, Snapshot, SnapshotInfo};
pub use index::{FlatIndex, VectorIndex};
pub use metadata::{InMemoryMetadataStore, MetadataStore, SqliteMetadataStore};
pub use model::{
    candidate::Candidate,
    record::{row_to_vector_id, vector_id_to_row, MetadataRecord, RowId, VectorId},
    result::{ResultEntry, RetrievalResult},
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Format tag written into every index snapshot.
pub const INDEX_FORMAT_VERSION: &str = "clipscape-index-1";

/// Serialisable index snapshot.
///
/// # Fields
/// - `metadata`: provenance, always carries `format_version`
/// - `metric`: space the vectors live in
/// - `dimension`: length of every vector
/// - `vectors`: embeddings in id order (position `i` is `VectorId(i)`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerializableIndex {
    pub metadata: HashMap<String, String>,
    pub metric: Metric,
    pub dimension: usize,
    pub vectors: Vec<Vec<f32>>,
}

impl From<&FlatIndex> for SerializableIndex {
    fn from(index: &FlatIndex) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            "format_version".to_string(),
            INDEX_FORMAT_VERSION.to_string(),
        );
        SerializableIndex {
            metadata,
            metric: index.metric(),
            dimension: index.dimension(),
            vectors: index.vectors().to_vec(),
        }
    }
}

/// Save `index` to a JSON file.
///
/// # Arguments
///
/// * `index` - index to persist
/// * `path` - filesystem path to write JSON to
///
/// # Errors
///
/// `IndexUnavailable` if the file cannot be created or written.
pub fn save_index_json(index: &FlatIndex, path: &Path) -> CoreResult<()> {
    let serial = SerializableIndex::from(index);
    let file = File::create(path).map_err(|e| {
        RetrievalError::IndexUnavailable(format!("creating {}: {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &serial).map_err(|e| {
        RetrievalError::IndexUnavailable(format!("writing {}: {}", path.display(), e))
    })?;
    writer.flush().map_err(|e| {
        RetrievalError::IndexUnavailable(format!("writing {}: {}", path.display(), e))
    })?;
    Ok(())
}

/// Load an index previously written with [`save_index_json`].
///
/// Every vector is re-validated on the way in (dimension, finiteness and,
/// for the inner-product space, unit norm).
///
/// # Errors
///
/// `IndexUnavailable` if the file is missing, unparsable, carries an unknown
/// `format_version`, or holds an invalid vector.
pub fn load_index_json(path: &Path) -> CoreResult<FlatIndex> {
    let file = File::open(path).map_err(|e| {
        RetrievalError::IndexUnavailable(format!("opening {}: {}", path.display(), e))
    })?;
    let serial: SerializableIndex = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        RetrievalError::IndexUnavailable(format!("parsing {}: {}", path.display(), e))
    })?;

    match serial.metadata.get("format_version").map(String::as_str) {
        Some(INDEX_FORMAT_VERSION) => {}
        other => {
            return Err(RetrievalError::IndexUnavailable(format!(
                "{}: unsupported format_version {:?}",
                path.display(),
                other
            )))
        }
    }

    FlatIndex::from_vectors(serial.metric, serial.dimension, serial.vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_version_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"metadata":{"format_version":"legacy-index-0"},"metric":"l2","dimension":2,"vectors":[]}"#,
        )
        .expect("write");
        let err = load_index_json(&path).unwrap_err();
        assert!(matches!(err, RetrievalError::IndexUnavailable(_)));
    }

    #[test]
    fn test_missing_file_is_index_unavailable() {
        let err = load_index_json(Path::new("/nonexistent/clipscape.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);
    }
}
