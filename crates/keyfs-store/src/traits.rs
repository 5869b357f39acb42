use std::path::Path;

use crate::error::StoreResult;

/// Byte-level persistence of one document per data file path.
///
/// Implementations must satisfy these invariants:
/// - `write` is all-or-nothing with respect to concurrent readers.
/// - `read` of a missing path fails with `StoreError::NotFound`.
/// - `delete` of a missing path succeeds and returns `false`.
pub trait DataStore: Send + Sync {
    /// Replace the content at `path` with `bytes`, creating parent
    /// directories as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> StoreResult<()>;

    /// Read the full content at `path`.
    fn read(&self, path: &Path) -> StoreResult<Vec<u8>>;

    /// Remove the data file at `path`. Returns `true` if it existed.
    fn delete(&self, path: &Path) -> StoreResult<bool>;

    /// Check whether a data file exists at `path`.
    fn exists(&self, path: &Path) -> StoreResult<bool>;
}
