/// Errors from metadata index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The database file does not have the expected schema.
    #[error("database does not have the required structure: {0}")]
    InvalidSchema(String),

    /// A stored row could not be decoded (e.g. a malformed digest).
    #[error("corrupt index row: {0}")]
    CorruptRow(String),

    /// Failure from the transactional backend, propagated unchanged.
    #[error("index backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
