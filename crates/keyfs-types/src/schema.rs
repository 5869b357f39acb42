//! Schema identities.
//!
//! A schema URI is a slash-delimited namespace path ending in a local name,
//! for example `/geo/shapes/Shape`. It maps one-to-one onto a directory
//! under the store root, so the same rules that keep git ref names safe on
//! disk apply here:
//!
//! - Must contain at least one component
//! - Must not contain whitespace, `\`, NUL, `:`, `*`, `?`
//! - Components must be non-empty (no `//`, no trailing `/`)
//! - Components must not be `.` or `..`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a schema URI.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '\0', '\\', ':', '*', '?'];

/// Identity of a document or key schema.
///
/// Always stored with a single leading `/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaUri(String);

impl SchemaUri {
    /// Parse and validate a schema URI. A missing leading `/` is added.
    ///
    /// ```
    /// use keyfs_types::SchemaUri;
    ///
    /// let uri = SchemaUri::parse("geo/Shape").unwrap();
    /// assert_eq!(uri.as_str(), "/geo/Shape");
    /// assert!(SchemaUri::parse("/geo/../Shape").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let reject = |reason: &str| TypeError::InvalidSchemaUri {
            uri: raw.to_string(),
            reason: reason.to_string(),
        };

        let body = raw.strip_prefix('/').unwrap_or(raw);
        if body.is_empty() {
            return Err(reject("must not be empty"));
        }

        for ch in FORBIDDEN_CHARS {
            if body.contains(*ch) {
                return Err(reject(&format!("contains forbidden character: {ch:?}")));
            }
        }

        for component in body.split('/') {
            match component {
                "" => return Err(reject("path components must not be empty")),
                "." | ".." => return Err(reject("must not contain '.' or '..' components")),
                _ => {}
            }
        }

        Ok(Self(format!("/{body}")))
    }

    /// The full URI, including the leading `/`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace path with the leading separator stripped.
    pub fn namespace_path(&self) -> &str {
        &self.0[1..]
    }

    /// The last component of the URI.
    pub fn local_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Debug for SchemaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaUri({})", self.0)
    }
}

impl fmt::Display for SchemaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SchemaUri {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SchemaUri {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SchemaUri> for String {
    fn from(uri: SchemaUri) -> Self {
        uri.0
    }
}

impl std::str::FromStr for SchemaUri {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
