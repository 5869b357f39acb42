use std::path::{Path, PathBuf};

use crate::key::{KeyValue, Keys};
use crate::schema::SchemaUri;

/// A typed value together with its schema identity and keys.
///
/// The engine never looks inside `content`; it only hands it to a
/// [`Codec`](crate::Codec).
#[derive(Clone, Debug, PartialEq)]
pub struct Document<T> {
    pub schema: SchemaUri,
    pub keys: Keys,
    pub content: T,
}

impl<T> Document<T> {
    pub fn new(schema: SchemaUri, content: T) -> Self {
        Self {
            schema,
            keys: Keys::new(),
            content,
        }
    }

    /// Add or replace a key.
    pub fn with_key(mut self, schema: SchemaUri, value: impl Into<KeyValue>) -> Self {
        self.keys.insert(schema, value);
        self
    }

    /// Attach a known data file under the given file-handle schema.
    pub fn with_file_handle(mut self, sentinel: SchemaUri, path: PathBuf) -> Self {
        self.keys.insert(sentinel, KeyValue::File(path));
        self
    }

    /// The data file this document is already bound to, if any.
    pub fn file_handle(&self) -> Option<&Path> {
        self.keys.file_handle()
    }
}
