//! Data file storage for keyfs.
//!
//! A data file is the single source of truth for one document. This crate
//! reads and writes whole data files and nothing else; it never interprets
//! their contents and never touches key links.
//!
//! # Design Rules
//!
//! 1. A write replaces the file atomically: readers see the old content or
//!    the new content, never a prefix.
//! 2. A failed write leaves no partial file behind.
//! 3. Every file handle is closed on every exit path.
//! 4. Deleting a missing file is not an error.
//! 5. All I/O errors carry the path they happened on.

pub mod error;
pub mod fs;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::{FsDataStore, SyncMode};
pub use traits::DataStore;
