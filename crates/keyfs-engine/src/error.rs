use std::io;
use std::path::PathBuf;

use keyfs_links::LinkError;
use keyfs_types::{Keys, SchemaUri};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`StorageEngine`](crate::StorageEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("document carries no keys")]
    MissingKeys,

    #[error("no document found for keys {keys}")]
    NotFound { keys: Keys },

    /// None of the document's keys can be laid out as a path.
    #[error("no key of document {schema} can be indexed")]
    Unindexable { schema: SchemaUri },

    #[error("file handle {} lies outside the store root", .path.display())]
    InvalidFileHandle { path: PathBuf },

    #[error("write failed at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("read failed at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("key link index error: {0}")]
    Index(#[from] LinkError),

    #[error("cannot open store root {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Write {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Read {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Errors loading or validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid file extension {0:?}")]
    InvalidExtension(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
