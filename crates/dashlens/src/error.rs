//! Error types for the lineage/observability engine.

use std::path::PathBuf;
use thiserror::Error;

/// Engine result type.
pub type Result<T> = std::result::Result<T, LensError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LensError {
    /// A required artifact file does not exist.
    #[error("Artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// An artifact file exists but could not be parsed.
    #[error("Artifact malformed: {}: {reason}", path.display())]
    ArtifactMalformed { path: PathBuf, reason: String },

    /// The requested node id is not present in the merged node view.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A caller-supplied parameter is invalid (unsafe path, partial
    /// explicit pair, unknown action or snapshot label).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The request was cancelled before the computation finished.
    #[error("Request cancelled")]
    Cancelled,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other internal fault.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for LensError {
    fn from(err: serde_json::Error) -> Self {
        LensError::Serialization(err.to_string())
    }
}
