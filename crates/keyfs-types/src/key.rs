//! Key values and key sets.
//!
//! A document is reachable through any of its keys. Each key is a pair of a
//! key schema and a [`KeyValue`]; a [`Keys`] set holds at most one value per
//! key schema and remembers the order in which the caller supplied them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;
use uuid::Uuid;

use crate::schema::SchemaUri;

/// A single scalar key component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Boolean(bool),
    Uuid(Uuid),
}

impl fmt::Display for Scalar {
    /// Canonical rendering used when a catalog does not override it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<Uuid> for Scalar {
    fn from(value: Uuid) -> Self {
        Scalar::Uuid(value)
    }
}

/// A key made of several named sub-slots.
///
/// Used when a key schema declares more than one key slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositeKey {
    slots: BTreeMap<String, Scalar>,
}

impl CompositeKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a sub-slot value, replacing any previous value.
    pub fn with(mut self, slot: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.slots.insert(slot.into(), value.into());
        self
    }

    pub fn get(&self, slot: &str) -> Option<&Scalar> {
        self.slots.get(slot)
    }

    /// Sub-slots in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The value of one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValue {
    /// A scalar rendered to a single path segment.
    Scalar(Scalar),
    /// A URI, laid out as `host/port/path`.
    Uri(Url),
    /// Several named scalars, one key link per sub-slot.
    Composite(CompositeKey),
    /// A direct path to a data file. Never linked; used as-is.
    File(PathBuf),
}

impl KeyValue {
    /// Returns `true` if this value is a direct file handle.
    pub fn is_file(&self) -> bool {
        matches!(self, KeyValue::File(_))
    }
}

macro_rules! scalar_key_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(value: $ty) -> Self {
                    KeyValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_key_value!(Scalar, &str, String, i64, bool, Uuid);

impl From<Url> for KeyValue {
    fn from(value: Url) -> Self {
        KeyValue::Uri(value)
    }
}

impl From<CompositeKey> for KeyValue {
    fn from(value: CompositeKey) -> Self {
        KeyValue::Composite(value)
    }
}

/// Ordered set of keys, unique by key schema.
///
/// Iteration follows insertion order. Re-inserting an existing key schema
/// replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keys {
    entries: Vec<(SchemaUri, KeyValue)>,
}

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Keys::insert`].
    pub fn with(mut self, schema: SchemaUri, value: impl Into<KeyValue>) -> Self {
        self.insert(schema, value);
        self
    }

    /// Insert or replace the value for `schema`.
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, schema: SchemaUri, value: impl Into<KeyValue>) -> Option<KeyValue> {
        let value = value.into();
        match self.entries.iter_mut().find(|(s, _)| *s == schema) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((schema, value));
                None
            }
        }
    }

    pub fn remove(&mut self, schema: &SchemaUri) -> Option<KeyValue> {
        let pos = self.entries.iter().position(|(s, _)| s == schema)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, schema: &SchemaUri) -> Option<&KeyValue> {
        self.entries
            .iter()
            .find(|(s, _)| s == schema)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaUri, &KeyValue)> {
        self.entries.iter().map(|(s, v)| (s, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first direct file handle among the keys, if any.
    pub fn file_handle(&self) -> Option<&Path> {
        self.entries.iter().find_map(|(_, v)| match v {
            KeyValue::File(p) => Some(p.as_path()),
            _ => None,
        })
    }

    /// A copy of these keys with every file handle removed.
    pub fn without_file_handle(&self) -> Keys {
        Keys {
            entries: self
                .entries
                .iter()
                .filter(|(_, v)| !v.is_file())
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Keys {
    type Item = (&'a SchemaUri, &'a KeyValue);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Display for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (schema, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                KeyValue::Scalar(s) => write!(f, "{schema}={s}")?,
                KeyValue::Uri(u) => write!(f, "{schema}={u}")?,
                KeyValue::File(p) => write!(f, "{schema}={}", p.display())?,
                KeyValue::Composite(c) => {
                    write!(f, "{schema}=(")?;
                    for (j, (slot, v)) in c.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{slot}: {v}")?;
                    }
                    f.write_str(")")?;
                }
            }
        }
        f.write_str("}")
    }
}
