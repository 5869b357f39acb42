use std::fs;
use std::path::{Path, PathBuf};

use keyfs_store::SyncMode;
use keyfs_types::SchemaUri;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Schema under which a document's known data file travels in its keys.
pub const DEFAULT_FILE_HANDLE_SCHEMA: &str = "/keyfs/FileHandle";

/// Everything a [`StorageEngine`](crate::StorageEngine) needs to know about
/// where and how to store documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory every schema directory lives under.
    pub root: PathBuf,
    /// Suffix of data files and key links, with its leading dot.
    pub extension: String,
    pub file_handle_schema: SchemaUri,
    pub sync_mode: SyncMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: ".json".into(),
            file_handle_schema: SchemaUri::parse(DEFAULT_FILE_HANDLE_SCHEMA)
                .expect("default file handle schema is valid"),
            sync_mode: SyncMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.normalized()
    }

    /// Read and parse a TOML file.
    ///
    /// A relative `root` inside the file is taken relative to the file's
    /// own directory.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Validate the extension and give it a leading dot if it lacks one.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.extension.trim();
        let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if bare.is_empty() || bare.contains(['/', '\\', '\0']) {
            return Err(ConfigError::InvalidExtension(self.extension));
        }
        self.extension = format!(".{bare}");
        Ok(self)
    }
}
