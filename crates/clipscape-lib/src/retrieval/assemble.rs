// Result assembly: join the best match and the cluster representatives to
// their metadata records with a single batched lookup.

use tracing::debug;

use crate::error::{CoreResult, RetrievalError};
use crate::metadata::MetadataStore;
use crate::model::candidate::Candidate;
use crate::model::record::vector_id_to_row;
use crate::model::result::{ResultEntry, RetrievalResult};

/// Attach metadata to `best` and `representatives`.
///
/// Issues exactly one `get_many` call. Any identifier without a row fails the
/// whole call with `MetadataInconsistency`; nothing is returned partially.
pub fn assemble(
    best: &Candidate,
    representatives: &[Candidate],
    store: &dyn MetadataStore,
) -> CoreResult<RetrievalResult> {
    let ordered: Vec<&Candidate> = std::iter::once(best).chain(representatives).collect();
    let rows: Vec<_> = ordered.iter().map(|c| vector_id_to_row(c.id)).collect();

    let records = store.get_many(&rows)?;
    debug!(requested = rows.len(), found = records.len(), "metadata lookup");

    let mut entries = Vec::with_capacity(ordered.len());
    for (candidate, row) in ordered.into_iter().zip(rows) {
        let metadata = match records.get(&row) {
            Some(record) => record.clone(),
            None => {
                return Err(RetrievalError::MetadataInconsistency {
                    vector_id: candidate.id,
                    row,
                })
            }
        };
        entries.push(ResultEntry {
            id: candidate.id,
            embedding: candidate.embedding.clone(),
            score: candidate.score,
            metadata,
        });
    }

    let mut entries = entries.into_iter();
    Ok(RetrievalResult {
        best_match: entries.next(),
        clusters: entries.collect(),
    })
}
