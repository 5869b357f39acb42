//! Foundation types for keyfs.
//!
//! keyfs stores typed, schema-identified documents directly on a filesystem
//! and uses symbolic links as the only lookup structure. This crate holds the
//! vocabulary every other keyfs crate speaks, plus the two seams where the
//! engine meets the outside world: the schema catalog and the codec.
//!
//! # Key Types
//!
//! - [`SchemaUri`] -- slash-delimited schema identity (`/geo/Shape`)
//! - [`Scalar`], [`CompositeKey`], [`KeyValue`] -- the values a key can take
//! - [`Keys`] -- ordered set of key values, unique by key schema
//! - [`Handle`] -- opaque token naming a data file
//! - [`Document`] -- a typed value together with its schema and keys
//! - [`SchemaCatalog`] / [`StaticCatalog`] -- unique names and declared key slots
//! - [`Codec`] / [`JsonCodec`] / [`RawCodec`] -- bytes in, bytes out

pub mod catalog;
pub mod codec;
pub mod document;
pub mod error;
pub mod handle;
pub mod key;
pub mod schema;

pub use catalog::{SchemaCatalog, StaticCatalog};
pub use codec::{Codec, JsonCodec, RawCodec};
pub use document::Document;
pub use error::{CodecError, TypeError};
pub use handle::Handle;
pub use key::{CompositeKey, KeyValue, Keys, Scalar};
pub use schema::SchemaUri;
