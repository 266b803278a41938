//! Translation between public API field names and internal storage names.

use serde_json::{Map, Value};

/// Bidirectional field name dictionary.
///
/// Entries are `(public, internal)` pairs. Names without an entry map to
/// themselves in both directions.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    entries: &'static [(&'static str, &'static str)],
}

impl FieldMapper {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Internal name for a single public name.
    pub fn to_internal<'a>(&self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(public, _)| *public == name)
            .map_or(name, |(_, internal)| *internal)
    }

    /// Public name for a single internal name.
    pub fn to_public<'a>(&self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, internal)| *internal == name)
            .map_or(name, |(public, _)| *public)
    }

    /// Map every segment of a dotted public path to internal names.
    pub fn path_to_internal(&self, path: &str) -> String {
        path.split('.')
            .map(|segment| self.to_internal(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Map every segment of a dotted internal path to public names.
    pub fn path_to_public(&self, path: &str) -> String {
        path.split('.')
            .map(|segment| self.to_public(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Map a list of public paths, preserving order.
    pub fn map_query<S: AsRef<str>>(&self, fields: &[S]) -> Vec<String> {
        fields
            .iter()
            .map(|field| self.path_to_internal(field.as_ref()))
            .collect()
    }

    /// Rename the top-level keys of a resolved object to their public names.
    pub fn map_response(&self, object: Map<String, Value>) -> Map<String, Value> {
        object
            .into_iter()
            .map(|(key, value)| (self.to_public(&key).to_string(), value))
            .collect()
    }
}
