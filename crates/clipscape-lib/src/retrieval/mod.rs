//! Retrieval pipeline: retrieve a wide candidate pool, diversify it, attach
//! metadata.
//!
//! The best match is always the nearest candidate and is never offered to
//! the diversifier, so it cannot reappear among the cluster representatives.

pub mod assemble;
pub mod diversify;
pub mod navigate;
pub mod retriever;

pub use assemble::assemble;
pub use diversify::diversify;
pub use navigate::{axis_direction, step, step_in};
pub use retriever::retrieve;

use crate::config::RetrievalConfig;
use crate::error::CoreResult;
use crate::index::VectorIndex;
use crate::metadata::MetadataStore;
use crate::model::result::RetrievalResult;

/// Run retrieve, diversify and assemble for one query vector.
///
/// Returns `EmptyPool` when the index yields nothing; converting that to an
/// empty response is left to the caller.
pub fn run(
    index: &dyn VectorIndex,
    store: &dyn MetadataStore,
    query: &[f32],
    cfg: &RetrievalConfig,
) -> CoreResult<RetrievalResult> {
    let pool = retrieve(index, query, cfg.pool_size)?;
    let (best, rest) = match pool.split_first() {
        Some(split) => split,
        None => return Err(crate::error::RetrievalError::EmptyPool),
    };
    let representatives = diversify(rest, cfg.cluster_count, &cfg.clustering);
    assemble(best, &representatives, store)
}
