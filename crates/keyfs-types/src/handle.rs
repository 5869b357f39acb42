use std::fmt;
use std::path::Path;

use uuid::Uuid;

use crate::error::TypeError;

/// Opaque token naming a document's data file.
///
/// A handle carries no meaning beyond identity. It is minted once when a
/// document is first inserted and reused by every later update, so the data
/// file stays at `<schema>/data/<handle><ext>` for its whole life.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Mint a fresh random handle (UUID v4, hyphenated).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Wrap an existing token. It must be usable as a single file name.
    pub fn new(token: impl Into<String>) -> Result<Self, TypeError> {
        let token = token.into();
        if token.is_empty()
            || token == "."
            || token == ".."
            || token.contains(['/', '\\', '\0'])
        {
            return Err(TypeError::InvalidHandle(token));
        }
        Ok(Self(token))
    }

    /// Recover the handle embedded in a data file path by stripping the
    /// store extension from its file name.
    ///
    /// Returns `None` if the file name does not end with `extension`.
    pub fn from_data_file(path: &Path, extension: &str) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let token = name.strip_suffix(extension)?;
        Self::new(token).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The data file name for this handle.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}{extension}", self.0)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
