//! Error types for fieldsync-recon.

use std::path::PathBuf;

use thiserror::Error;

use fieldsync_client::{EditError, QueryError};

/// Fatal failures that abort a whole workflow run.
///
/// Per-item conditions (extraction failures, zero-match update targets) are
/// reported and skipped inside the workflows; they never become this type.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A read against the feature store failed.
    #[error("query phase failed: {0}")]
    Query(#[from] QueryError),

    /// A delete or update batch failed.
    #[error("edit phase failed: {0}")]
    Edit(#[from] EditError),

    /// Local I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`WorkflowError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WorkflowError {
    WorkflowError::Io {
        path: path.into(),
        source,
    }
}
