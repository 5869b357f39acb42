//! Key link index for keyfs.
//!
//! Each key of a document is materialized as a symbolic link under its key
//! schema's `keys/` directory, pointing at the document's data file through
//! a relative path. The links are a lookup structure only: they hold no
//! state of their own, and resolving a key set is a matter of following the
//! first link that leads to a live data file.
//!
//! # Modules
//!
//! - [`error`] -- Error types for link operations
//! - [`index`] -- [`KeyLinkIndex`]: resolve, write, and remove links
//! - [`sweep`] -- [`SweepReport`]: dangling link detection and pruning

pub mod error;
pub mod index;
pub mod sweep;

pub use error::{LinkError, LinkResult};
pub use index::KeyLinkIndex;
pub use sweep::SweepReport;
