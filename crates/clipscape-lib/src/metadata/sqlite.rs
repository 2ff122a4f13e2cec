// SQLite-backed metadata store.
//
// Expects the table written by the ingestion scripts:
//   metadata(id TEXT PRIMARY KEY, url TEXT NOT NULL, description TEXT)
// with rows inserted in vector-index order, so `rowid` is the one-based key.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};

use crate::error::{CoreResult, RetrievalError};
use crate::metadata::MetadataStore;
use crate::model::record::{MetadataRecord, RowId};

/// Read-only view over a metadata database.
///
/// A single connection is shared; the mutex serialises statement execution.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open an existing database file read-only.
    ///
    /// # Errors
    ///
    /// `MetadataUnavailable` if the file is missing, unreadable or has no
    /// `metadata` table.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            RetrievalError::MetadataUnavailable(format!("opening {}: {}", path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    /// Wrap an already-open connection (used with in-memory databases).
    pub fn from_connection(conn: Connection) -> CoreResult<Self> {
        conn.query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get::<_, i64>(0))
            .map_err(|e| {
                RetrievalError::MetadataUnavailable(format!("metadata table not readable: {}", e))
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn get_many(&self, rows: &[RowId]) -> CoreResult<HashMap<RowId, MetadataRecord>> {
        if rows.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; rows.len()].join(", ");
        let sql = format!(
            "SELECT rowid, id, url, description FROM metadata WHERE rowid IN ({})",
            placeholders
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let found = stmt
            .query_map(rusqlite::params_from_iter(rows.iter().map(|r| r.0)), |row| {
                let rowid: i64 = row.get(0)?;
                Ok((
                    RowId(rowid),
                    MetadataRecord {
                        id: row.get(1)?,
                        url: row.get(2)?,
                        description: row.get(3)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(found)
    }

    fn len(&self) -> CoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    fn row_range(&self) -> CoreResult<Option<(RowId, RowId)>> {
        let conn = self.conn.lock();
        let (lo, hi): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(rowid), MAX(rowid) FROM metadata",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(lo.zip(hi).map(|(lo, hi)| (RowId(lo), RowId(hi))))
    }
}
