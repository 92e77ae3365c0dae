//! Crate-wide error taxonomy and result alias.

use std::path::PathBuf;

/// Result alias used across the crate.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors produced by corpus indexing and context-window queries.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// A build or query parameter failed eager validation. Raised before
    /// any I/O is attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A corpus file, index directory, or persisted dictionary is missing
    /// or unreadable. Never retried internally; regeneration is the
    /// caller's decision.
    #[error("resource not found: {0}")]
    ResourceNotFound(PathBuf),

    /// A persisted file failed its checksum or could not be parsed.
    #[error("corrupt index file: {0}")]
    CorruptIndex(PathBuf),

    /// A window word is absent from the corpus dictionary. Every window
    /// token was tokenized from the same corpus, so this indicates a bug
    /// in tokenization/indexing consistency, not a recoverable state.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    /// A window-extraction query exceeded its deadline.
    #[error("query timed out")]
    QueryTimeout,

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
