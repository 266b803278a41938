//! Field query parsing and classification.
//!
//! A client asks for fields by public, dotted path. Classification maps the
//! paths to internal names and decides which of them are read from the
//! on-chain record and which are flattened out of the off-chain documents.

use crate::types::{FieldSet, Segment, DESCRIPTION_ROOT};

/// Parse a raw `fields` query into individual paths.
///
/// Each element may itself be comma-joined; empty entries are dropped. An
/// empty result means the caller should fall back to its defaults.
pub fn parse_field_query<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|part| {
            part.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Split requested fields by data source for a segment.
///
/// Unknown fields are dropped from `on_chain` and `to_flatten` without error;
/// `mapped` keeps every requested path in the order the client sent them.
pub fn classify<S: AsRef<str>>(segment: &Segment, requested: &[S]) -> FieldSet {
    let mapped = segment.mapper().map_query(requested);

    let on_chain = mapped
        .iter()
        .filter(|field| segment.on_chain_fields.contains(&field.as_str()))
        .cloned()
        .collect();

    let to_flatten = mapped
        .iter()
        .filter_map(|field| {
            let root = field.split('.').next().unwrap_or(field);
            if segment.description_fields.contains(&root) {
                Some(format!("{DESCRIPTION_ROOT}.{field}"))
            } else if segment.is_document_root(root) {
                Some(field.clone())
            } else {
                None
            }
        })
        .collect();

    FieldSet {
        mapped,
        on_chain,
        to_flatten,
    }
}

/// Classify a raw query, falling back to `defaults` when it names no fields.
pub fn classify_query<I, S>(segment: &Segment, raw: I, defaults: &[&str]) -> FieldSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let requested = parse_field_query(raw);
    if requested.is_empty() {
        classify(segment, defaults)
    } else {
        classify(segment, &requested)
    }
}
