//! On-disk layout for keyfs.
//!
//! Every path the store touches is derived here, without I/O:
//!
//! ```text
//! <root>/<schema unique name>/data/<handle><ext>
//! <root>/<key schema unique name>/keys/<derived key path><ext>
//! ```
//!
//! Key paths are derived from the key value itself:
//!
//! - a scalar becomes the trailing segment(s) under `keys/`
//! - a URI becomes `host/port/path`
//! - a composite key yields one path per sub-slot
//! - a blank trailing segment becomes `index`
//!
//! Derivation returns `None` when a value cannot name a file inside its
//! schema's `keys/` directory. Callers skip such keys.

pub mod deriver;
pub mod normalize;

pub use deriver::{PathDeriver, DATA_DIR, INDEX_SEGMENT, KEYS_DIR, MAX_SEGMENT_LEN};
pub use normalize::normalize;
