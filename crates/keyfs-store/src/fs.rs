use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::DataStore;

/// Flush strategy for data file writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` every data file before it replaces the old one.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering.
    OsDefault,
}

/// Data store backed by plain files.
///
/// Writes go to a temporary file in the destination directory which is
/// then renamed over the destination, so a reader never observes a
/// partially written document.
#[derive(Clone, Debug, Default)]
pub struct FsDataStore {
    sync_mode: SyncMode,
}

impl FsDataStore {
    pub fn new(sync_mode: SyncMode) -> Self {
        Self { sync_mode }
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }
}

impl DataStore for FsDataStore {
    fn write(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

        // Dropping the temp file on any early return removes it.
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
        tmp.write_all(bytes).map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
        if self.sync_mode == SyncMode::EveryWrite {
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

        debug!(path = %path.display(), len = bytes.len(), "data file written");
        Ok(())
    }

    fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_path_buf(),
            },
            _ => StoreError::io(path, e),
        })
    }

    fn delete(&self, path: &Path) -> StoreResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "data file removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn exists(&self, path: &Path) -> StoreResult<bool> {
        path.try_exists().map_err(|e| StoreError::io(path, e))
    }
}
