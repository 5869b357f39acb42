//! Symbolic links from key paths to data files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use keyfs_layout::{normalize, PathDeriver};
use keyfs_types::Keys;
use tracing::{debug, warn};

use crate::error::{LinkError, LinkResult};

/// Lookup structure mapping key values to data files.
///
/// Stateless apart from the path deriver: everything it knows is read back
/// from the filesystem on each call.
#[derive(Clone, Debug)]
pub struct KeyLinkIndex {
    deriver: PathDeriver,
}

impl KeyLinkIndex {
    pub fn new(deriver: PathDeriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &PathDeriver {
        &self.deriver
    }

    /// Resolve a key set to the data file it identifies.
    ///
    /// Keys are tried in iteration order and the first one that leads to a
    /// live data file wins. Unindexable keys and dangling links are misses.
    pub fn resolve(&self, keys: &Keys) -> LinkResult<Option<PathBuf>> {
        for (schema, value) in keys {
            for path in self.deriver.key_link_paths(schema, value) {
                if let Some(data_file) = self.resolve_link(&path)? {
                    debug!(
                        key_schema = %schema,
                        link = %path.display(),
                        data_file = %data_file.display(),
                        "key resolved"
                    );
                    return Ok(Some(data_file));
                }
            }
        }
        Ok(None)
    }

    /// Follow a single key path one hop.
    ///
    /// A regular file is returned as-is; this is how a direct file handle
    /// resolves. A symbolic link is dereferenced once and returned only if
    /// it leads to a regular file.
    pub fn resolve_link(&self, path: &Path) -> LinkResult<Option<PathBuf>> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => return Err(LinkError::io(path, e)),
        };

        if !meta.file_type().is_symlink() {
            return Ok(meta.is_file().then(|| path.to_path_buf()));
        }

        let target = link_target(path)?;
        match fs::symlink_metadata(&target) {
            Ok(meta) if meta.is_file() => Ok(Some(target)),
            Ok(_) => {
                warn!(
                    link = %path.display(),
                    target = %target.display(),
                    "key link does not lead to a data file"
                );
                Ok(None)
            }
            Err(e) if is_absent(&e) => {
                warn!(
                    link = %path.display(),
                    target = %target.display(),
                    "dangling key link"
                );
                Ok(None)
            }
            Err(e) => Err(LinkError::io(target, e)),
        }
    }

    /// Point the key link at `link` to the data file at `target`.
    ///
    /// The link stores a path relative to its own directory. Whatever was at
    /// `link` before is replaced. Fails with [`LinkError::BrokenTarget`] if
    /// the data file does not exist yet.
    pub fn write(&self, link: &Path, target: &Path) -> LinkResult<()> {
        match fs::symlink_metadata(target) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(LinkError::BrokenTarget {
                    link: link.to_path_buf(),
                    target: target.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LinkError::BrokenTarget {
                    link: link.to_path_buf(),
                    target: target.to_path_buf(),
                })
            }
            Err(e) => return Err(LinkError::io(target, e)),
        }

        let no_relative = || LinkError::NoRelativePath {
            link: link.to_path_buf(),
            target: target.to_path_buf(),
        };
        let link_dir = link.parent().ok_or_else(no_relative)?;
        fs::create_dir_all(link_dir).map_err(|e| LinkError::io(link_dir, e))?;
        let relative = pathdiff::diff_paths(target, link_dir).ok_or_else(no_relative)?;

        match fs::symlink_metadata(link) {
            Ok(meta) if meta.is_dir() => {
                return Err(LinkError::io(
                    link,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "a directory occupies the key link path",
                    ),
                ))
            }
            Ok(_) => fs::remove_file(link).map_err(|e| LinkError::io(link, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(LinkError::io(link, e)),
        }

        create_symlink(&relative, link).map_err(|e| LinkError::io(link, e))?;
        debug!(link = %link.display(), target = %relative.display(), "key link written");
        Ok(())
    }

    /// Remove the key link at `link` if it points at `data_file`.
    ///
    /// Returns `true` if a link was removed. Regular files are never removed.
    pub fn remove_if_targets(&self, link: &Path, data_file: &Path) -> LinkResult<bool> {
        match fs::symlink_metadata(link) {
            Ok(meta) if meta.file_type().is_symlink() => {}
            Ok(_) => return Ok(false),
            Err(e) if is_absent(&e) => return Ok(false),
            Err(e) => return Err(LinkError::io(link, e)),
        }

        if link_target(link)? != normalize(data_file) {
            return Ok(false);
        }
        remove_link(link)
    }

    /// Remove the key link at `link` if it no longer leads to a data file.
    pub fn remove_if_dangling(&self, link: &Path) -> LinkResult<bool> {
        match fs::symlink_metadata(link) {
            Ok(meta) if meta.file_type().is_symlink() => {}
            Ok(_) => return Ok(false),
            Err(e) if is_absent(&e) => return Ok(false),
            Err(e) => return Err(LinkError::io(link, e)),
        }

        if self.resolve_link(link)?.is_some() {
            return Ok(false);
        }
        remove_link(link)
    }
}

/// Errors meaning nothing can exist at the path: it is missing, runs
/// through a regular file, or is not a name the OS accepts.
fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidFilename
    )
}

/// Where a symbolic link points, as a normalized path.
fn link_target(link: &Path) -> LinkResult<PathBuf> {
    let raw = fs::read_link(link).map_err(|e| LinkError::io(link, e))?;
    Ok(match link.parent() {
        Some(parent) => normalize(&parent.join(raw)),
        None => normalize(&raw),
    })
}

fn remove_link(link: &Path) -> LinkResult<bool> {
    match fs::remove_file(link) {
        Ok(()) => {
            debug!(link = %link.display(), "key link removed");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LinkError::io(link, e)),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
