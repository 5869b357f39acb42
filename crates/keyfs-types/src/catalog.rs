//! The schema catalog boundary.
//!
//! keyfs does not own a type system. Whatever does supplies three facts
//! through [`SchemaCatalog`]: the unique name a schema is stored under, the
//! key slots it declares, and how scalar key values are spelled.

use std::collections::HashMap;

use crate::key::Scalar;
use crate::schema::SchemaUri;

/// Schema facts consumed by the path deriver.
///
/// `unique_name` must be injective across schemas; the store relies on it
/// to keep schema directories apart.
pub trait SchemaCatalog: Send + Sync {
    /// Slash-delimited namespace path for `schema`, without a leading `/`.
    fn unique_name(&self, schema: &SchemaUri) -> String {
        schema.namespace_path().to_string()
    }

    /// Declared key slot names, in declaration order.
    fn key_slots(&self, schema: &SchemaUri) -> Vec<String>;

    /// Canonical string form of a scalar key value.
    fn render_scalar(&self, value: &Scalar) -> String {
        value.to_string()
    }
}

#[derive(Clone, Debug, Default)]
struct SchemaEntry {
    unique_name: Option<String>,
    slots: Vec<String>,
}

/// A catalog assembled up front from explicit declarations.
///
/// Undeclared schemas fall back to the trait defaults: their URI path is
/// their unique name and they declare no slots.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    schemas: HashMap<SchemaUri, SchemaEntry>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the key slots of `schema`.
    pub fn declare<I, S>(mut self, schema: SchemaUri, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas.entry(schema).or_default().slots =
            slots.into_iter().map(Into::into).collect();
        self
    }

    /// Store `schema` under a unique name other than its URI path.
    pub fn rename(mut self, schema: SchemaUri, unique_name: impl Into<String>) -> Self {
        let name = unique_name.into();
        self.schemas.entry(schema).or_default().unique_name =
            Some(name.trim_start_matches('/').to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaCatalog for StaticCatalog {
    fn unique_name(&self, schema: &SchemaUri) -> String {
        self.schemas
            .get(schema)
            .and_then(|e| e.unique_name.clone())
            .unwrap_or_else(|| schema.namespace_path().to_string())
    }

    fn key_slots(&self, schema: &SchemaUri) -> Vec<String> {
        self.schemas
            .get(schema)
            .map(|e| e.slots.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(s: &str) -> SchemaUri {
        SchemaUri::parse(s).unwrap()
    }

    #[test]
    fn undeclared_schema_uses_uri_path() {
        let catalog = StaticCatalog::new();
        assert_eq!(catalog.unique_name(&schema("/geo/Shape")), "geo/Shape");
        assert!(catalog.key_slots(&schema("/geo/Shape")).is_empty());
        assert!(catalog.is_empty());
    }

    #[test]
    fn declared_slots_keep_order() {
        let catalog = StaticCatalog::new().declare(schema("/Pair"), ["zone", "id"]);
        assert_eq!(catalog.key_slots(&schema("/Pair")), vec!["zone", "id"]);
    }

    #[test]
    fn rename_strips_leading_slash() {
        let catalog = StaticCatalog::new()
            .declare(schema("/Shape"), ["id"])
            .rename(schema("/Shape"), "/org/example/Shape");
        assert_eq!(catalog.unique_name(&schema("/Shape")), "org/example/Shape");
        assert_eq!(catalog.key_slots(&schema("/Shape")), vec!["id"]);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn default_scalar_rendering() {
        let catalog = StaticCatalog::new();
        assert_eq!(catalog.render_scalar(&Scalar::Integer(42)), "42");
    }
}
