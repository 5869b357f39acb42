use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use keyfs_types::{CompositeKey, Handle, KeyValue, Scalar, SchemaCatalog, SchemaUri};
use url::Url;

use crate::normalize::normalize;

/// Directory holding a schema's data files.
pub const DATA_DIR: &str = "data";
/// Directory holding a schema's key links.
pub const KEYS_DIR: &str = "keys";
/// Segment substituted for a blank trailing key segment.
pub const INDEX_SEGMENT: &str = "index";
/// Longest file name most filesystems accept, in bytes.
pub const MAX_SEGMENT_LEN: usize = 255;

/// Pure mapping from schemas, handles and key values to paths under a root.
///
/// All returned paths are lexically normalized.
#[derive(Clone)]
pub struct PathDeriver {
    root: PathBuf,
    extension: String,
    catalog: Arc<dyn SchemaCatalog>,
}

impl fmt::Debug for PathDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathDeriver")
            .field("root", &self.root)
            .field("extension", &self.extension)
            .finish()
    }
}

impl PathDeriver {
    /// `extension` is appended verbatim, so it should carry its leading dot.
    pub fn new(
        root: impl AsRef<Path>,
        extension: impl Into<String>,
        catalog: Arc<dyn SchemaCatalog>,
    ) -> Self {
        Self {
            root: normalize(root.as_ref()),
            extension: extension.into(),
            catalog,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn catalog(&self) -> &dyn SchemaCatalog {
        self.catalog.as_ref()
    }

    /// `<root>/<unique name of schema>`.
    pub fn schema_directory(&self, schema: &SchemaUri) -> PathBuf {
        let name = self.catalog.unique_name(schema);
        normalize(&self.root.join(name.trim_start_matches('/')))
    }

    pub fn data_directory(&self, schema: &SchemaUri) -> PathBuf {
        self.schema_directory(schema).join(DATA_DIR)
    }

    pub fn keys_directory(&self, schema: &SchemaUri) -> PathBuf {
        self.schema_directory(schema).join(KEYS_DIR)
    }

    /// `<root>/<schema>/data/<handle><ext>`.
    pub fn data_file_path(&self, schema: &SchemaUri, handle: &Handle) -> PathBuf {
        self.data_directory(schema)
            .join(handle.file_name(&self.extension))
    }

    /// Recover the handle from a data file path produced by this deriver.
    pub fn handle_of(&self, data_file: &Path) -> Option<Handle> {
        Handle::from_data_file(data_file, &self.extension)
    }

    /// Derive the single path a key value is found at.
    ///
    /// Scalars and URIs yield a key link path. A file handle yields its own
    /// path. Composite keys have no single path and yield `None`; use
    /// [`PathDeriver::key_link_paths`] for them.
    pub fn key_link_path(&self, schema: &SchemaUri, value: &KeyValue) -> Option<PathBuf> {
        match value {
            KeyValue::Scalar(scalar) => self.scalar_link_path(schema, scalar),
            KeyValue::Uri(url) => self.uri_link_path(schema, url),
            KeyValue::File(path) => Some(normalize(path)),
            KeyValue::Composite(_) => None,
        }
    }

    /// Derive every path a key value is found at, expanding composite keys
    /// into one path per sub-slot. Unindexable values yield nothing.
    pub fn key_link_paths(&self, schema: &SchemaUri, value: &KeyValue) -> Vec<PathBuf> {
        match value {
            KeyValue::Composite(composite) => self.composite_link_paths(schema, composite),
            other => self.key_link_path(schema, other).into_iter().collect(),
        }
    }

    /// `<root>/<schema>/keys/<rendered scalar><ext>`.
    pub fn scalar_link_path(&self, schema: &SchemaUri, scalar: &Scalar) -> Option<PathBuf> {
        let rendered = self.catalog.render_scalar(scalar);
        let path = push_value_path(self.keys_directory(schema), &rendered);
        self.finish(schema, path)
    }

    /// `<root>/<schema>/keys/<host>/<port>/<path><ext>`.
    ///
    /// The port is the URI's explicit port, else the scheme's well-known
    /// default; schemes without one get no port segment. URIs without a
    /// host are unindexable.
    pub fn uri_link_path(&self, schema: &SchemaUri, url: &Url) -> Option<PathBuf> {
        let host = url.host_str().filter(|h| !h.is_empty())?;
        let mut path = self.keys_directory(schema);
        path.push(host);
        if let Some(port) = url.port_or_known_default() {
            path.push(port.to_string());
        }
        let path = push_value_path(path, url.path());
        self.finish(schema, path)
    }

    /// Declared slots first, in declaration order, then undeclared ones.
    fn composite_link_paths(&self, schema: &SchemaUri, composite: &CompositeKey) -> Vec<PathBuf> {
        let declared = self.catalog.key_slots(schema);
        let ordered = declared
            .iter()
            .filter_map(|slot| composite.get(slot))
            .chain(
                composite
                    .iter()
                    .filter(|(slot, _)| !declared.iter().any(|d| d == slot))
                    .map(|(_, v)| v),
            );

        let mut paths: Vec<PathBuf> = Vec::with_capacity(composite.len());
        for scalar in ordered {
            if let Some(path) = self.scalar_link_path(schema, scalar) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Append the extension, normalize, and reject anything that left the
    /// schema's `keys/` directory or cannot be a file name.
    fn finish(&self, schema: &SchemaUri, path: PathBuf) -> Option<PathBuf> {
        let path = normalize(&with_extension_suffix(path, &self.extension));
        let keys_dir = self.keys_directory(schema);
        let relative = path.strip_prefix(&keys_dir).ok()?;
        if relative.as_os_str().is_empty() {
            return None;
        }
        relative
            .components()
            .all(|c| is_usable_segment(c.as_os_str().as_encoded_bytes()))
            .then_some(path)
    }
}

/// Push the segments of `raw` onto `base`, replacing a blank trailing
/// segment with [`INDEX_SEGMENT`]. Empty inner segments are dropped.
fn push_value_path(mut base: PathBuf, raw: &str) -> PathBuf {
    let trimmed = raw.trim_start_matches('/');
    let (dirs, last) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    for segment in dirs.split('/').filter(|s| !s.is_empty()) {
        base.push(segment);
    }
    if last.trim().is_empty() {
        base.push(INDEX_SEGMENT);
    } else {
        base.push(last);
    }
    base
}

fn is_usable_segment(segment: &[u8]) -> bool {
    !segment.is_empty() && segment.len() <= MAX_SEGMENT_LEN && !segment.contains(&0)
}

fn with_extension_suffix(path: PathBuf, extension: &str) -> PathBuf {
    if path.to_string_lossy().ends_with(extension) {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(extension);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyfs_types::StaticCatalog;
    use proptest::prelude::*;

    fn schema(s: &str) -> SchemaUri {
        SchemaUri::parse(s).unwrap()
    }

    fn deriver() -> PathDeriver {
        deriver_with(StaticCatalog::new())
    }

    fn deriver_with(catalog: StaticCatalog) -> PathDeriver {
        PathDeriver::new("/store", ".json", Arc::new(catalog))
    }

    fn link(d: &PathDeriver, s: &str, v: impl Into<KeyValue>) -> Option<PathBuf> {
        d.key_link_path(&schema(s), &v.into())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // ---- Schema and data paths ----

    #[test]
    fn schema_directory_strips_leading_separator() {
        let d = deriver();
        assert_eq!(d.schema_directory(&schema("/geo/Shape")), PathBuf::from("/store/geo/Shape"));
    }

    #[test]
    fn schema_directory_uses_catalog_unique_name() {
        let catalog = StaticCatalog::new().rename(schema("/Shape"), "org/example/Shape");
        let d = deriver_with(catalog);
        assert_eq!(
            d.schema_directory(&schema("/Shape")),
            PathBuf::from("/store/org/example/Shape")
        );
    }

    #[test]
    fn data_file_path_layout() {
        let d = deriver();
        let h = Handle::new("abc").unwrap();
        assert_eq!(
            d.data_file_path(&schema("/Shape"), &h),
            PathBuf::from("/store/Shape/data/abc.json")
        );
    }

    #[test]
    fn handle_of_data_file() {
        let d = deriver();
        let h = Handle::generate();
        let path = d.data_file_path(&schema("/Shape"), &h);
        assert_eq!(d.handle_of(&path), Some(h));
    }

    #[test]
    fn relative_root_is_normalized() {
        let d = PathDeriver::new("./store/.", ".json", Arc::new(StaticCatalog::new()));
        assert_eq!(d.root(), Path::new("store"));
        assert_eq!(d.keys_directory(&schema("/S")), PathBuf::from("store/S/keys"));
    }

    // ---- Scalar keys ----

    #[test]
    fn scalar_key_path() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Shape", "42"),
            Some(PathBuf::from("/store/Shape/keys/42.json"))
        );
        assert_eq!(
            link(&d, "/Shape", 42i64),
            Some(PathBuf::from("/store/Shape/keys/42.json"))
        );
    }

    #[test]
    fn scalar_with_slashes_nests() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Doc", "a/b/c"),
            Some(PathBuf::from("/store/Doc/keys/a/b/c.json"))
        );
    }

    #[test]
    fn blank_scalar_becomes_index() {
        let d = deriver();
        assert_eq!(link(&d, "/Doc", ""), Some(PathBuf::from("/store/Doc/keys/index.json")));
        assert_eq!(link(&d, "/Doc", "   "), Some(PathBuf::from("/store/Doc/keys/index.json")));
    }

    #[test]
    fn trailing_slash_becomes_index() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Doc", "dir/"),
            Some(PathBuf::from("/store/Doc/keys/dir/index.json"))
        );
    }

    #[test]
    fn extension_not_doubled() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Doc", "report.json"),
            Some(PathBuf::from("/store/Doc/keys/report.json"))
        );
    }

    #[test]
    fn dotted_value_keeps_its_dot() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Doc", "1.5"),
            Some(PathBuf::from("/store/Doc/keys/1.5.json"))
        );
    }

    #[test]
    fn parent_segments_are_resolved() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Doc", "a/../b"),
            Some(PathBuf::from("/store/Doc/keys/b.json"))
        );
    }

    #[test]
    fn escaping_value_is_unindexable() {
        let d = deriver();
        assert_eq!(link(&d, "/Doc", "../../etc/passwd"), None);
        assert_eq!(link(&d, "/Doc", "../Other/keys/x"), None);
    }

    #[test]
    fn nul_in_value_is_unindexable() {
        let d = deriver();
        assert_eq!(link(&d, "/Doc", "a\0b"), None);
        assert_eq!(link(&d, "/Doc", "dir\0/b"), None);
    }

    #[test]
    fn overlong_segment_is_unindexable() {
        let d = deriver();
        assert_eq!(link(&d, "/Doc", "x".repeat(300).as_str()), None);
        assert_eq!(link(&d, "/Doc", format!("{}/b", "x".repeat(256)).as_str()), None);
        // The extension counts towards the limit.
        let fits = "x".repeat(MAX_SEGMENT_LEN - ".json".len());
        assert!(link(&d, "/Doc", fits.as_str()).is_some());
        assert_eq!(link(&d, "/Doc", format!("{fits}x").as_str()), None);
    }

    #[test]
    fn leading_slash_in_value_stays_inside() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Doc", "/abs"),
            Some(PathBuf::from("/store/Doc/keys/abs.json"))
        );
    }

    // ---- URI keys ----

    #[test]
    fn uri_key_uses_host_port_path() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Page", url("http://example.com:8080/a/b")),
            Some(PathBuf::from("/store/Page/keys/example.com/8080/a/b.json"))
        );
    }

    #[test]
    fn uri_default_port_follows_scheme() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Page", url("http://example.com/a")),
            Some(PathBuf::from("/store/Page/keys/example.com/80/a.json"))
        );
        assert_eq!(
            link(&d, "/Page", url("https://example.com/a")),
            Some(PathBuf::from("/store/Page/keys/example.com/443/a.json"))
        );
    }

    #[test]
    fn uri_without_known_port_omits_segment() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Page", url("custom://example.com/a")),
            Some(PathBuf::from("/store/Page/keys/example.com/a.json"))
        );
    }

    #[test]
    fn uri_root_path_becomes_index() {
        let d = deriver();
        assert_eq!(
            link(&d, "/Page", url("http://example.com")),
            Some(PathBuf::from("/store/Page/keys/example.com/80/index.json"))
        );
        assert_eq!(
            link(&d, "/Page", url("http://example.com/docs/")),
            Some(PathBuf::from("/store/Page/keys/example.com/80/docs/index.json"))
        );
    }

    #[test]
    fn uri_without_host_is_unindexable() {
        let d = deriver();
        assert_eq!(link(&d, "/Page", url("urn:isbn:0451450523")), None);
        assert_eq!(link(&d, "/Page", url("file:///etc/hosts")), None);
    }

    // ---- Composite and file keys ----

    #[test]
    fn composite_has_no_single_path() {
        let d = deriver();
        let key = CompositeKey::new().with("id", "1");
        assert_eq!(link(&d, "/Pair", key), None);
    }

    #[test]
    fn composite_yields_one_path_per_slot_in_declared_order() {
        let catalog = StaticCatalog::new().declare(schema("/Pair"), ["zone", "id"]);
        let d = deriver_with(catalog);
        let key = KeyValue::from(CompositeKey::new().with("id", 7i64).with("zone", "eu"));
        assert_eq!(
            d.key_link_paths(&schema("/Pair"), &key),
            vec![
                PathBuf::from("/store/Pair/keys/eu.json"),
                PathBuf::from("/store/Pair/keys/7.json"),
            ]
        );
    }

    #[test]
    fn composite_undeclared_slots_follow_in_name_order() {
        let catalog = StaticCatalog::new().declare(schema("/Pair"), ["zone"]);
        let d = deriver_with(catalog);
        let key = KeyValue::from(
            CompositeKey::new().with("b", "2").with("zone", "eu").with("a", "1"),
        );
        assert_eq!(
            d.key_link_paths(&schema("/Pair"), &key),
            vec![
                PathBuf::from("/store/Pair/keys/eu.json"),
                PathBuf::from("/store/Pair/keys/1.json"),
                PathBuf::from("/store/Pair/keys/2.json"),
            ]
        );
    }

    #[test]
    fn composite_duplicate_values_collapse() {
        let d = deriver();
        let key = KeyValue::from(CompositeKey::new().with("a", "x").with("b", "x"));
        assert_eq!(d.key_link_paths(&schema("/Pair"), &key).len(), 1);
    }

    #[test]
    fn file_handle_is_used_as_is() {
        let d = deriver();
        let value = KeyValue::File(PathBuf::from("/store/Shape/data/./h.json"));
        assert_eq!(
            d.key_link_path(&schema("/keyfs/FileHandle"), &value),
            Some(PathBuf::from("/store/Shape/data/h.json"))
        );
    }

    // ---- Properties ----

    proptest! {
        #[test]
        fn derivation_is_deterministic(raw in ".{0,40}") {
            let d = deriver();
            let s = schema("/Doc");
            let v = KeyValue::from(raw.as_str());
            prop_assert_eq!(d.key_link_path(&s, &v), d.key_link_path(&s, &v));
        }

        #[test]
        fn derived_paths_stay_in_keys_dir(raw in "[a-z./ ]{0,30}") {
            let d = deriver();
            let s = schema("/Doc");
            if let Some(path) = d.key_link_path(&s, &KeyValue::from(raw.as_str())) {
                prop_assert!(path.starts_with("/store/Doc/keys"));
                prop_assert!(path.to_string_lossy().ends_with(".json"));
            }
        }

        #[test]
        fn plain_values_are_always_indexable(raw in "[a-zA-Z0-9_-]{1,30}") {
            let d = deriver();
            let path = d.key_link_path(&schema("/Doc"), &KeyValue::from(raw.as_str()));
            prop_assert!(path.is_some());
        }
    }
}
