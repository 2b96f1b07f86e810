use std::path::PathBuf;

/// Errors from merge store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested store location holds something that is not a store.
    #[error("refusing to use {} as a merge store: {reason}", .path.display())]
    ForeignPath { path: PathBuf, reason: String },

    /// A stored frame failed its length or checksum validation.
    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
