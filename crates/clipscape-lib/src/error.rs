//! Error taxonomy for the retrieval core.
//!
//! Every failure the pipeline can surface is a [`RetrievalError`]. Callers
//! that sit behind a transport (HTTP, CLI `--json`) convert it into an
//! [`ErrorResponse`] carrying a stable [`ErrorKind`] and a message.
//!
//! Clustering degeneracy is not represented here: the diversifier recovers
//! from it locally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::record::{RowId, VectorId};

/// Top-level error type for retrieval, assembly and navigation.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("nearest-neighbour query returned no candidates")]
    EmptyPool,

    #[error("no metadata row {row} for vector id {vector_id}; index and metadata store are out of sync")]
    MetadataInconsistency { vector_id: VectorId, row: RowId },

    #[error("metadata store unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("invalid {what} dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("degenerate {0} vector: norm is zero or not finite")]
    DegenerateVector(&'static str),

    #[error("query vector must have unit norm for inner-product search (norm = {norm})")]
    NotNormalized { norm: f32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("embedding provider failed: {0}")]
    Embedding(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, RetrievalError>;

/// Machine-readable error kind reported to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IndexUnavailable,
    EmptyPool,
    MetadataInconsistency,
    MetadataUnavailable,
    DimensionMismatch,
    DegenerateVector,
    NotNormalized,
    InvalidInput,
    Embedding,
    InvalidConfig,
}

impl ErrorKind {
    /// HTTP-style status class for a transport layer.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::DimensionMismatch
            | ErrorKind::DegenerateVector
            | ErrorKind::NotNormalized
            | ErrorKind::InvalidInput => 400,
            ErrorKind::EmptyPool => 404,
            ErrorKind::MetadataInconsistency | ErrorKind::InvalidConfig => 500,
            ErrorKind::Embedding => 502,
            ErrorKind::IndexUnavailable | ErrorKind::MetadataUnavailable => 503,
        }
    }

    /// Whether the caller supplied the bad input (4xx) rather than the server failing.
    pub fn is_caller_error(self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::IndexUnavailable(_) => ErrorKind::IndexUnavailable,
            RetrievalError::EmptyPool => ErrorKind::EmptyPool,
            RetrievalError::MetadataInconsistency { .. } => ErrorKind::MetadataInconsistency,
            RetrievalError::MetadataUnavailable(_) => ErrorKind::MetadataUnavailable,
            RetrievalError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            RetrievalError::DegenerateVector(_) => ErrorKind::DegenerateVector,
            RetrievalError::NotNormalized { .. } => ErrorKind::NotNormalized,
            RetrievalError::InvalidInput(_) => ErrorKind::InvalidInput,
            RetrievalError::Embedding(_) => ErrorKind::Embedding,
            RetrievalError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_caller_error(&self) -> bool {
        self.kind().is_caller_error()
    }

    /// Structured form for transports.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RetrievalError {
    fn from(err: rusqlite::Error) -> Self {
        RetrievalError::MetadataUnavailable(err.to_string())
    }
}

/// Structured error payload: an error kind and a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RetrievalError> for ErrorResponse {
    fn from(err: &RetrievalError) -> Self {
        err.to_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = RetrievalError::DimensionMismatch {
            what: "direction",
            expected: 512,
            actual: 384,
        };
        assert!(err.to_string().contains("512"));
        assert!(err.to_string().contains("384"));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_integrity_errors_are_server_side() {
        let err = RetrievalError::MetadataInconsistency {
            vector_id: VectorId(4),
            row: RowId(5),
        };
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_caller_error());
        assert_eq!(RetrievalError::IndexUnavailable("gone".into()).status_code(), 503);
    }

    #[test]
    fn test_error_response_serialises_kind() {
        let resp = RetrievalError::DegenerateVector("navigation").to_response();
        let json = serde_json::to_value(&resp).expect("serialise");
        assert_eq!(json["kind"], "degenerate_vector");
        assert!(json["message"].as_str().unwrap_or_default().contains("navigation"));
    }
}
