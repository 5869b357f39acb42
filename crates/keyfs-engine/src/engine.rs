use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use keyfs_layout::{normalize, PathDeriver, DATA_DIR};
use keyfs_links::{KeyLinkIndex, SweepReport};
use keyfs_store::{DataStore, FsDataStore, StoreError};
use keyfs_types::{Codec, Document, Handle, KeyValue, Keys, SchemaCatalog, SchemaUri};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::lock::LockTable;

/// Keyed document storage on a plain filesystem.
///
/// Each document lives in one data file; each of its keys is a symbolic
/// link leading to that file. Safe to share between threads.
pub struct StorageEngine<C: Codec> {
    config: EngineConfig,
    deriver: PathDeriver,
    store: FsDataStore,
    links: KeyLinkIndex,
    locks: LockTable,
    codec: C,
}

impl<C: Codec> StorageEngine<C> {
    /// Open a store, creating its root directory if needed.
    ///
    /// The root is canonicalized so every derived path is absolute.
    pub fn open(
        config: EngineConfig,
        catalog: Arc<dyn SchemaCatalog>,
        codec: C,
    ) -> EngineResult<Self> {
        let mut config = config.normalized()?;
        fs::create_dir_all(&config.root).map_err(|source| EngineError::Root {
            path: config.root.clone(),
            source,
        })?;
        config.root = fs::canonicalize(&config.root).map_err(|source| EngineError::Root {
            path: config.root.clone(),
            source,
        })?;

        let deriver = PathDeriver::new(&config.root, config.extension.clone(), catalog);
        let links = KeyLinkIndex::new(deriver.clone());
        info!(
            root = %config.root.display(),
            extension = %config.extension,
            sync_mode = ?config.sync_mode,
            "storage engine opened"
        );

        Ok(Self {
            store: FsDataStore::new(config.sync_mode),
            config,
            deriver,
            links,
            locks: LockTable::new(),
            codec,
        })
    }

    /// The effective configuration, with the root canonicalized.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The canonical store root.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// The path deriver every data file and key link path comes from.
    pub fn deriver(&self) -> &PathDeriver {
        &self.deriver
    }

    /// Schema under which documents carry their data file.
    pub fn file_handle_schema(&self) -> &SchemaUri {
        &self.config.file_handle_schema
    }

    // ---- Reads ----

    /// Fetch the document `keys` lead to, decoded as `type_hint`.
    ///
    /// The returned document carries the data file it was read from under
    /// the file-handle schema.
    pub fn get(&self, keys: &Keys, type_hint: &SchemaUri) -> EngineResult<Document<C::Value>> {
        let data_file = self
            .links
            .resolve(&self.checked_keys(keys)?)?
            .ok_or_else(|| EngineError::NotFound { keys: keys.clone() })?;
        self.load(keys, type_hint, data_file)
    }

    /// Whether any of `keys` leads to a live data file.
    pub fn exists(&self, keys: &Keys) -> EngineResult<bool> {
        Ok(self.links.resolve(&self.checked_keys(keys)?)?.is_some())
    }

    fn load(
        &self,
        keys: &Keys,
        type_hint: &SchemaUri,
        data_file: PathBuf,
    ) -> EngineResult<Document<C::Value>> {
        let bytes = match self.store.read(&data_file) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound { .. }) => {
                return Err(EngineError::NotFound { keys: keys.clone() })
            }
            Err(e) => return Err(EngineError::read(data_file, e)),
        };
        let content = self
            .codec
            .decode(&bytes, keys, type_hint)
            .map_err(|e| EngineError::read(&data_file, e))?;

        let mut doc_keys = keys.without_file_handle();
        doc_keys.insert(self.config.file_handle_schema.clone(), KeyValue::File(data_file));
        Ok(Document {
            schema: type_hint.clone(),
            keys: doc_keys,
            content,
        })
    }

    // ---- Writes ----

    /// Insert or update `document`.
    ///
    /// The data file is chosen in this order: the document's own file
    /// handle if that file still exists, the data file any of its keys
    /// already leads to, or a new handle. Keys that cannot be laid out as a
    /// path are skipped. Returns the document as read back from disk.
    pub fn save(&self, document: &Document<C::Value>) -> EngineResult<Document<C::Value>> {
        if document.keys.is_empty() {
            return Err(EngineError::MissingKeys);
        }

        let link_paths = self.link_paths(&document.keys);
        let handle = document
            .file_handle()
            .map(|path| self.checked_file_handle(path))
            .transpose()?;
        if link_paths.is_empty() && handle.is_none() {
            return Err(EngineError::Unindexable {
                schema: document.schema.clone(),
            });
        }

        let bytes = self
            .codec
            .encode(&document.content)
            .map_err(|e| EngineError::write(self.deriver.data_directory(&document.schema), e))?;

        let _links_guard = self.locks.acquire(link_paths.iter().cloned());

        let known = match handle {
            Some(path) if path.is_file() => Some(path),
            Some(path) => {
                debug!(data_file = %path.display(), "file handle no longer exists, ignored");
                None
            }
            None => None,
        };
        if known.is_none() && link_paths.is_empty() {
            return Err(EngineError::Unindexable {
                schema: document.schema.clone(),
            });
        }

        let data_file = match known {
            Some(path) => {
                debug!(data_file = %path.display(), "update through file handle");
                path
            }
            None => match self.first_live_link(&link_paths)? {
                Some(existing) => {
                    let path = self
                        .deriver
                        .handle_of(&existing)
                        .map(|h| self.deriver.data_file_path(&document.schema, &h))
                        .unwrap_or(existing);
                    debug!(data_file = %path.display(), "update through existing key link");
                    path
                }
                None => {
                    let path = self
                        .deriver
                        .data_file_path(&document.schema, &Handle::generate());
                    debug!(data_file = %path.display(), "insert");
                    path
                }
            },
        };

        if link_paths.contains(&data_file) {
            return Err(EngineError::InvalidFileHandle { path: data_file });
        }
        let _data_guard = self.locks.acquire([data_file.clone()]);

        self.store
            .write(&data_file, &bytes)
            .map_err(|e| EngineError::write(&data_file, e))?;
        for link in &link_paths {
            self.links
                .write(link, &data_file)
                .map_err(|e| EngineError::write(link, e))?;
        }

        self.load(&document.keys, &document.schema, data_file)
    }

    /// Delete the document `keys` lead to, along with every link derived
    /// from `keys` that still points at it.
    ///
    /// Returns `false` if nothing was found. Links from keys not named here
    /// are left dangling; see [`StorageEngine::prune`].
    pub fn delete(&self, keys: &Keys) -> EngineResult<bool> {
        if keys.is_empty() {
            return Err(EngineError::MissingKeys);
        }

        let link_paths = self.link_paths(keys);
        let _links_guard = self.locks.acquire(link_paths.iter().cloned());

        let Some(resolved) = self.links.resolve(&self.checked_keys(keys)?)? else {
            debug!(%keys, "delete found nothing");
            return Ok(false);
        };
        let data_file = self.checked_file_handle(&resolved)?;
        let _data_guard =
            (!link_paths.contains(&data_file)).then(|| self.locks.acquire([data_file.clone()]));

        let removed = self
            .store
            .delete(&data_file)
            .map_err(|e| EngineError::write(&data_file, e))?;
        for link in &link_paths {
            if let Err(e) = self.links.remove_if_targets(link, &data_file) {
                warn!(link = %link.display(), error = %e, "key link not removed");
            }
        }

        debug!(data_file = %data_file.display(), removed, "document deleted");
        Ok(removed)
    }

    // ---- Maintenance ----

    /// Count data files and key links, listing the dangling ones.
    pub fn verify(&self) -> EngineResult<SweepReport> {
        Ok(self.links.sweep(false)?)
    }

    /// Remove every dangling key link under the root.
    ///
    /// Each link is re-checked under its lock, so a link rewritten by a
    /// concurrent save is left alone.
    pub fn prune(&self) -> EngineResult<SweepReport> {
        let mut report = self.links.sweep(false)?;
        for link in &report.dangling {
            let _guard = self.locks.acquire([link.clone()]);
            if self.links.remove_if_dangling(link)? {
                report.removed += 1;
            }
        }
        info!(
            dangling = report.dangling.len(),
            removed = report.removed,
            "prune complete"
        );
        Ok(report)
    }

    // ---- Helpers ----

    /// Every key link path derived from `keys`, in key order, without
    /// duplicates. File handles and unindexable keys contribute nothing.
    fn link_paths(&self, keys: &Keys) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for (schema, value) in keys {
            if value.is_file() || *schema == self.config.file_handle_schema {
                continue;
            }
            let derived = self.deriver.key_link_paths(schema, value);
            if derived.is_empty() {
                debug!(key_schema = %schema, "key cannot be indexed, skipped");
            }
            for path in derived {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// The data file the first of `link_paths` still leading to one points at.
    fn first_live_link(&self, link_paths: &[PathBuf]) -> EngineResult<Option<PathBuf>> {
        for link in link_paths {
            if let Some(target) = self.links.resolve_link(link)? {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }

    /// A file handle must name `<schema>/data/<handle><ext>` inside the
    /// root and must not be a symbolic link. Relative handles are taken
    /// relative to the root.
    fn checked_file_handle(&self, path: &Path) -> EngineResult<PathBuf> {
        let path = normalize(&self.config.root.join(path));
        let in_data_dir = path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|name| name == DATA_DIR);
        let is_link = fs::symlink_metadata(&path).is_ok_and(|meta| meta.file_type().is_symlink());
        if path.starts_with(&self.config.root)
            && in_data_dir
            && self.deriver.handle_of(&path).is_some()
            && !is_link
        {
            Ok(path)
        } else {
            Err(EngineError::InvalidFileHandle { path })
        }
    }

    /// `keys` with every file handle replaced by its checked form.
    fn checked_keys(&self, keys: &Keys) -> EngineResult<Keys> {
        let mut checked = Keys::new();
        for (schema, value) in keys {
            let value = match value {
                KeyValue::File(path) => KeyValue::File(self.checked_file_handle(path)?),
                other => other.clone(),
            };
            checked.insert(schema.clone(), value);
        }
        Ok(checked)
    }
}
