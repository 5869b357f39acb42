//! Error types for key link operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while maintaining key links.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The data file a link should point at does not exist.
    #[error("cannot link {} to missing data file {}", .link.display(), .target.display())]
    BrokenTarget { link: PathBuf, target: PathBuf },

    /// No relative path leads from the link's directory to the target.
    #[error("no relative path from {} to {}", .link.display(), .target.display())]
    NoRelativePath { link: PathBuf, target: PathBuf },

    /// I/O failure on a link or its directory.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory walk failure during a sweep.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl LinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for link operations.
pub type LinkResult<T> = std::result::Result<T, LinkError>;
