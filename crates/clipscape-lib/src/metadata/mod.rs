//! Metadata store boundary.
//!
//! Records are keyed by one-based [`RowId`]s populated in the same order as
//! the vector index. Use [`crate::model::record::vector_id_to_row`] to go from
//! a search hit to its row.

mod sqlite;

pub use sqlite::SqliteMetadataStore;

use std::collections::HashMap;

use crate::error::CoreResult;
use crate::model::record::{MetadataRecord, RowId};

/// Batch lookup of descriptive records.
pub trait MetadataStore: Send + Sync {
    /// Fetch every requested row in a single query. Rows that do not exist are
    /// absent from the returned map; callers decide whether that is an error.
    fn get_many(&self, rows: &[RowId]) -> CoreResult<HashMap<RowId, MetadataRecord>>;

    /// Number of rows.
    fn len(&self) -> CoreResult<usize>;

    /// Smallest and largest row id, or `None` when the store is empty.
    fn row_range(&self) -> CoreResult<Option<(RowId, RowId)>>;
}

/// Metadata held in memory, row `i + 1` being `records[i]`.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Vec<MetadataRecord>,
}

impl InMemoryMetadataStore {
    pub fn new(records: Vec<MetadataRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get_many(&self, rows: &[RowId]) -> CoreResult<HashMap<RowId, MetadataRecord>> {
        Ok(rows
            .iter()
            .filter_map(|row| {
                let idx = usize::try_from(row.0.checked_sub(1)?).ok()?;
                self.records.get(idx).map(|r| (*row, r.clone()))
            })
            .collect())
    }

    fn len(&self) -> CoreResult<usize> {
        Ok(self.records.len())
    }

    fn row_range(&self) -> CoreResult<Option<(RowId, RowId)>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        let last = i64::try_from(self.records.len()).unwrap_or(i64::MAX);
        Ok(Some((RowId(1), RowId(last))))
    }
}
