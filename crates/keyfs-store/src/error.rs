use std::io;
use std::path::PathBuf;

/// Errors from data file operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The data file does not exist.
    #[error("data file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// I/O failure on a data file or its directory.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
