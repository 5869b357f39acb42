//! Dangling link detection and pruning.

use std::path::{Path, PathBuf};

use keyfs_layout::DATA_DIR;
use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use crate::error::LinkResult;
use crate::index::KeyLinkIndex;

/// Outcome of walking the tree under the store root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Data files seen.
    pub data_files: usize,
    /// Key links seen, dangling or not.
    pub links: usize,
    /// Links that no longer lead to a data file.
    pub dangling: Vec<PathBuf>,
    /// Dangling links removed by this sweep.
    pub removed: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.len() == self.removed
    }
}

impl KeyLinkIndex {
    /// Walk everything under the root, counting data files and key links.
    ///
    /// With `prune` set, every dangling link is removed as it is found.
    /// Symbolic links are never followed during the walk.
    pub fn sweep(&self, prune: bool) -> LinkResult<SweepReport> {
        let root = self.deriver().root();
        let mut report = SweepReport::default();
        if !root.is_dir() {
            return Ok(report);
        }

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                report.links += 1;
                if self.resolve_link(entry.path())?.is_none() {
                    if prune && self.remove_if_dangling(entry.path())? {
                        report.removed += 1;
                    }
                    report.dangling.push(entry.into_path());
                }
            } else if file_type.is_file() && self.is_data_file(entry.path()) {
                report.data_files += 1;
            }
        }

        info!(
            root = %root.display(),
            data_files = report.data_files,
            links = report.links,
            dangling = report.dangling.len(),
            removed = report.removed,
            "sweep complete"
        );
        Ok(report)
    }

    fn is_data_file(&self, path: &Path) -> bool {
        let in_data_dir = path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|name| name == DATA_DIR);
        in_data_dir && self.deriver().handle_of(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyfs_layout::PathDeriver;
    use keyfs_types::{Handle, KeyValue, SchemaUri, StaticCatalog};
    use std::fs;
    use std::sync::Arc;

    fn schema(s: &str) -> SchemaUri {
        SchemaUri::parse(s).unwrap()
    }

    fn index_at(root: &Path) -> KeyLinkIndex {
        KeyLinkIndex::new(PathDeriver::new(root, ".json", Arc::new(StaticCatalog::new())))
    }

    fn put(index: &KeyLinkIndex, s: &str, key: &str) -> (PathBuf, PathBuf) {
        let data = index
            .deriver()
            .data_file_path(&schema(s), &Handle::generate());
        fs::create_dir_all(data.parent().unwrap()).unwrap();
        fs::write(&data, b"{}").unwrap();
        let link = index
            .deriver()
            .key_link_path(&schema(s), &KeyValue::from(key))
            .unwrap();
        index.write(&link, &data).unwrap();
        (data, link)
    }

    #[test]
    fn sweep_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_at(&dir.path().join("absent"));
        assert_eq!(index.sweep(false).unwrap(), SweepReport::default());
    }

    #[test]
    fn sweep_counts_live_tree() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_at(dir.path());
        put(&index, "/Shape", "1");
        put(&index, "/Shape", "2");
        put(&index, "/geo/Point", "a/b");

        let report = index.sweep(false).unwrap();
        assert_eq!(report.data_files, 3);
        assert_eq!(report.links, 3);
        assert!(report.dangling.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn sweep_reports_without_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_at(dir.path());
        let (data, link) = put(&index, "/Shape", "1");
        put(&index, "/Shape", "2");
        fs::remove_file(&data).unwrap();

        let report = index.sweep(false).unwrap();
        assert_eq!(report.data_files, 1);
        assert_eq!(report.links, 2);
        assert_eq!(report.dangling, vec![link.clone()]);
        assert_eq!(report.removed, 0);
        assert!(!report.is_clean());
        assert!(fs::symlink_metadata(&link).is_ok());
    }

    #[test]
    fn sweep_prunes_dangling_links() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_at(dir.path());
        let (data, link) = put(&index, "/Shape", "1");
        fs::remove_file(&data).unwrap();

        let report = index.sweep(true).unwrap();
        assert_eq!(report.removed, 1);
        assert!(report.is_clean());
        assert!(fs::symlink_metadata(&link).is_err());

        let again = index.sweep(false).unwrap();
        assert_eq!(again.links, 0);
    }

    #[test]
    fn sweep_ignores_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_at(dir.path());
        fs::create_dir_all(dir.path().join("Shape/data")).unwrap();
        fs::write(dir.path().join("Shape/data/notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("keyfs.toml"), b"").unwrap();

        let report = index.sweep(false).unwrap();
        assert_eq!(report.data_files, 0);
        assert_eq!(report.links, 0);
    }
}
