use std::io;
use std::path::PathBuf;

use uidmerge_store::StoreError;

/// Errors that abort a merge run.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A non-blank line is not a single valid JSON value.
    #[error("{file}: invalid JSON at line {line}: {source}")]
    Parse {
        file: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A record lacks the identifier field (or it is empty).
    #[error("{file}: missing {key} at line {line}")]
    MissingKey {
        file: String,
        line: usize,
        key: String,
    },

    /// Reading an input or writing the output failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The merge store failed.
    #[error("merge store error: {0}")]
    Store(#[from] StoreError),

    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the core crate.
pub type MergeResult<T> = Result<T, MergeError>;
