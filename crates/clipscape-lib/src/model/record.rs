// Identifier spaces and metadata records.
//
// The vector index numbers its entries from zero in insertion order; the
// metadata store numbers rows from one (SQLite rowid). Both are populated in
// the same order, so the only translation between them is the offset below.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based position of an embedding in the vector index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(pub u64);

/// One-based row key in the metadata store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Translate a vector index position into the metadata row that describes it.
///
/// Vector `0` is row `1`. Ids past the row key range saturate at
/// `i64::MAX`, which no index-ordered store reaches.
pub fn vector_id_to_row(id: VectorId) -> RowId {
    let row = i64::try_from(id.0)
        .ok()
        .and_then(|v| v.checked_add(1))
        .unwrap_or(i64::MAX);
    RowId(row)
}

/// Inverse of [`vector_id_to_row`]. Rows below `1` have no vector.
pub fn row_to_vector_id(row: RowId) -> Option<VectorId> {
    if row.0 < 1 {
        return None;
    }
    Some(VectorId((row.0 - 1) as u64))
}

/// Descriptive fields stored for each indexed image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Stable record id from the source dataset (e.g. a photo id).
    pub id: String,
    pub url: String,
    #[serde(rename = "desc")]
    pub description: Option<String>,
}
