//! Extraction of requested sub-trees from nested documents.
//!
//! Off-chain data is a tree of plain JSON objects and storage pointers
//! (`{"ref": ..., "contents": ...}`). Flattening takes a list of dotted paths
//! and returns a tree holding only those paths, unwrapping storage pointers
//! on the way down.
//!
//! When no path segment of a level is a key of the current value, the
//! segments are broadcast to the children instead:
//!
//! | Source at that level | Result |
//! |----------------------|--------|
//! | array of objects | [`Projection::Sequence`] of partial objects, one per element |
//! | object of keyed objects | [`Projection::Keyed`], the field extracted under each key |
//!
//! A record with other kinds of values, or one that holds some of the
//! requested keys, is never broadcast into; its missing fields are omitted.
//!
//! Partial objects produced by a broadcast also carry the element's own `id`.

use serde_json::{Map, Value};

use crate::types::ID_FIELD;

/// Keys identifying a storage pointer.
const POINTER_REF_KEYS: &[&str] = &["ref", "reference"];
const POINTER_CONTENTS_KEY: &str = "contents";

/// Shape of a flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// A value copied verbatim.
    Leaf(Value),
    /// Selected keys of a single object.
    Object(Vec<(String, Projection)>),
    /// A field broadcast across the elements of an array.
    Sequence(Vec<Projection>),
    /// A field broadcast across the values of a keyed object.
    Keyed(Vec<(String, Projection)>),
}

impl Projection {
    /// Child projection stored under `key`, for object-like variants.
    pub fn get(&self, key: &str) -> Option<&Projection> {
        match self {
            Projection::Object(entries) | Projection::Keyed(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, child)| child),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Projection::Leaf(value) => value,
            Projection::Object(entries) | Projection::Keyed(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, child)| (key, child.into_value()))
                    .collect(),
            ),
            Projection::Sequence(items) => {
                Value::Array(items.into_iter().map(Projection::into_value).collect())
            }
        }
    }
}

impl From<Projection> for Value {
    fn from(projection: Projection) -> Self {
        projection.into_value()
    }
}

/// What is selected below one path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Whole,
    Paths(Vec<String>),
}

/// Flatten `source` down to `fields`, returning plain JSON.
pub fn flatten<S: AsRef<str>>(source: &Value, fields: &[S]) -> Value {
    project(source, fields).into_value()
}

/// Flatten `source` down to `fields`, keeping the projection shape.
///
/// Fields missing from the source are omitted without error.
pub fn project<S: AsRef<str>>(source: &Value, fields: &[S]) -> Projection {
    let selections = group_paths(fields.iter().map(AsRef::as_ref));
    project_level(source, &selections)
}

/// Unwrap a storage pointer to its contents; other values pass through.
pub fn storage_contents(value: &Value) -> &Value {
    match value {
        Value::Object(map) if is_storage_pointer(map) => &map[POINTER_CONTENTS_KEY],
        other => other,
    }
}

/// Reference of a storage pointer, if `value` is one.
pub fn storage_reference(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    POINTER_REF_KEYS
        .iter()
        .find_map(|key| map.get(*key))
        .and_then(Value::as_str)
}

fn is_storage_pointer(map: &Map<String, Value>) -> bool {
    POINTER_REF_KEYS.iter().any(|key| map.contains_key(*key))
        && map
            .get(POINTER_CONTENTS_KEY)
            .is_some_and(|contents| !contents.is_null())
}

/// Group paths by first segment, keeping first-appearance order.
///
/// A bare segment selects the whole subtree and wins over sub-paths.
fn group_paths<'a>(fields: impl Iterator<Item = &'a str>) -> Vec<(String, Selection)> {
    let mut groups: Vec<(String, Selection)> = Vec::new();
    for field in fields {
        let (head, rest) = match field.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (field, None),
        };
        let position = match groups.iter().position(|(name, _)| name == head) {
            Some(position) => position,
            None => {
                groups.push((head.to_string(), Selection::Paths(Vec::new())));
                groups.len() - 1
            }
        };
        let selection = &mut groups[position].1;
        match (rest, selection) {
            (None, selection) => *selection = Selection::Whole,
            (Some(rest), Selection::Paths(paths)) => paths.push(rest.to_string()),
            (Some(_), Selection::Whole) => {}
        }
    }
    groups
}

fn select(value: &Value, selection: &Selection) -> Projection {
    let unwrapped = storage_contents(value);
    match selection {
        Selection::Whole => Projection::Leaf(unwrapped.clone()),
        Selection::Paths(paths) => {
            project_level(unwrapped, &group_paths(paths.iter().map(String::as_str)))
        }
    }
}

/// Whether `map` is a keyed collection the selections should be broadcast
/// into: none of them names a key of its own and every value is an object.
fn is_keyed_collection(map: &Map<String, Value>, selections: &[(String, Selection)]) -> bool {
    !selections.iter().any(|(name, _)| map.contains_key(name))
        && map.values().all(|child| storage_contents(child).is_object())
}

fn project_level(source: &Value, selections: &[(String, Selection)]) -> Projection {
    let mut direct: Vec<(String, Projection)> = Vec::new();
    let mut rows: Option<Vec<Vec<(String, Projection)>>> = None;
    let mut keyed: Vec<(String, Vec<(String, Projection)>)> = Vec::new();
    let broadcast = source
        .as_object()
        .is_some_and(|map| is_keyed_collection(map, selections));

    for (name, selection) in selections {
        match source {
            Value::Object(map) if map.contains_key(name) => {
                direct.push((name.clone(), select(&map[name], selection)));
            }
            Value::Array(elements) => {
                let rows =
                    rows.get_or_insert_with(|| elements.iter().map(identity_of).collect());
                for (row, element) in rows.iter_mut().zip(elements) {
                    if let Some(value) = element.get(name) {
                        upsert(row, name, select(value, selection));
                    }
                }
            }
            Value::Object(map) if broadcast => {
                for (key, child) in map {
                    let Some(value) = storage_contents(child).get(name) else {
                        continue;
                    };
                    let position = match keyed.iter().position(|(k, _)| k == key) {
                        Some(position) => position,
                        None => {
                            keyed.push((key.clone(), identity_of(storage_contents(child))));
                            keyed.len() - 1
                        }
                    };
                    upsert(&mut keyed[position].1, name, select(value, selection));
                }
            }
            _ => {}
        }
    }

    if let Some(rows) = rows {
        return Projection::Sequence(rows.into_iter().map(Projection::Object).collect());
    }
    if !keyed.is_empty() {
        return Projection::Keyed(
            keyed
                .into_iter()
                .map(|(key, entries)| (key, Projection::Object(entries)))
                .collect(),
        );
    }
    Projection::Object(direct)
}

/// Starting entries of a broadcast partial object: the element's `id`, if any.
fn identity_of(element: &Value) -> Vec<(String, Projection)> {
    element
        .get(ID_FIELD)
        .map(|id| vec![(ID_FIELD.to_string(), Projection::Leaf(id.clone()))])
        .unwrap_or_default()
}

fn upsert(entries: &mut Vec<(String, Projection)>, key: &str, value: Projection) {
    match entries.iter_mut().find(|(name, _)| name == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key.to_string(), value)),
    }
}
