//! Typed failure conditions for the retrieval pipeline.
//!
//! Most functions in this crate propagate `anyhow::Error`. The variants
//! below cover the conditions callers need to distinguish programmatically
//! (empty query rejection, missing prior state, dimension drift). They are
//! carried inside `anyhow::Error` and recovered with `downcast_ref`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Query was blank or whitespace-only. Rejected before any index or
    /// provider is touched.
    #[error("query must not be empty")]
    EmptyQuery,

    /// Lexical search was attempted before any documents were added.
    #[error("lexical index has not been built")]
    IndexNotBuilt,

    /// A persisted index artifact is absent. Callers decide whether this
    /// means "start fresh" or abort.
    #[error("index file not found: {0}")]
    IndexNotFound(PathBuf),

    /// A produced embedding disagrees with the configured dimension.
    /// Fatal for the enclosing document; likely a misconfiguration.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The splitter could not tokenize a document. Recoverable: the
    /// caller may skip the document.
    #[error("failed to split document into chunks: {0}")]
    ChunkingFailure(String),
}
