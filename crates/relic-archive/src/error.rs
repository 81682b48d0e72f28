use std::path::PathBuf;

use relic_types::Digest;

/// Errors from archive operations.
///
/// `AlreadyExists` and `NotFound` are ordinary, expected outcomes reported
/// as typed results; I/O and index failures propagate unchanged, since
/// masking a storage failure risks inconsistency.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// `create` was called on a path that already holds a store.
    #[error("a store already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    /// `open` was called on a path that does not hold a valid store.
    #[error("not a store: {}: {reason}", path.display())]
    NotAStore { path: PathBuf, reason: String },

    /// No entry exists for this digest.
    #[error("no entry for digest {0}")]
    NotFound(Digest),

    /// A condition token had no `=` separator.
    #[error("metadata should have format key=value, got '{0}'")]
    MalformedCondition(String),

    /// Filesystem failure, propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object store failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] relic_store::StoreError),

    /// Metadata index failure, propagated unchanged.
    #[error(transparent)]
    Index(#[from] relic_index::IndexError),
}

/// Result alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
