//! Storage engine for keyfs.
//!
//! Ties the path deriver, data store and key link index together into the
//! externally visible contract:
//!
//! - [`StorageEngine::get`] resolves a key set and decodes the data file
//! - [`StorageEngine::save`] upserts a document, reusing the handle of any
//!   data file one of its keys already leads to
//! - [`StorageEngine::delete`] removes the data file and the links that
//!   lead to it
//!
//! Writers serialize on the paths they touch through a [`LockTable`].
//! Nothing is rolled back when a save fails part way; saving again is safe.

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;

pub use config::EngineConfig;
pub use engine::StorageEngine;
pub use error::{ConfigError, EngineError, EngineResult};
pub use lock::{LockGuard, LockTable};

pub use keyfs_links::SweepReport;
pub use keyfs_store::SyncMode;
