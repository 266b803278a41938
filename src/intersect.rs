//! Pruning of `required` constraints to the fields a client asked for.
//!
//! The models of a schema document form a graph: properties, array items,
//! `allOf` parts and plain `$ref`s point at other models or at inline
//! fragments. Starting from a root model, every reachable schema has its
//! `required` list cut down to the requested fields of its nesting level.
//!
//! Targets are addressed by JSON pointer into the `components.schemas`
//! object, so inline fragments are pruned where they live. A named model
//! reached by paths with different sub-fields is split into per-field-set
//! copies. A model is never processed twice with the same field set, which
//! keeps cyclic model graphs finite.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;
use tracing::trace;

/// Prefix of local references to named models.
pub const MODEL_REF_PREFIX: &str = "#/components/schemas/";

/// Name of the model a `$ref` points at, if it points at a named model.
///
/// Remote references are reduced to their fragment first, so
/// `https://host/doc.yaml#/components/schemas/Currency` yields `Currency`.
pub fn reference_name(reference: &str) -> Option<&str> {
    let fragment = &reference[reference.find('#')?..];
    fragment.strip_prefix(MODEL_REF_PREFIX)
}

/// Escape one JSON pointer token (RFC 6901).
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn model_pointer(name: &str) -> String {
    format!("/{}", escape_token(name))
}

fn reference_of(schema: &Value) -> Option<&str> {
    schema.get("$ref").and_then(Value::as_str)
}

fn is_array(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("array")
}

/// Group dotted paths by first segment, keeping the remaining suffixes.
///
/// Paths without a dot contribute no group. Group order follows first
/// appearance.
fn nested_groups(fields: &[String]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for field in fields {
        let Some((base, rest)) = field.split_once('.') else {
            continue;
        };
        match groups.iter_mut().find(|(name, _)| name == base) {
            Some((_, suffixes)) => suffixes.push(rest.to_string()),
            None => groups.push((base.to_string(), vec![rest.to_string()])),
        }
    }
    groups
}

/// Where an array schema's elements are described.
fn items_target(pointer: &str, array: &Value) -> Option<Target> {
    let items = array.get("items")?;
    Some(match reference_of(items).and_then(reference_name) {
        Some(name) => Target::Model(name.to_string()),
        None => Target::Fragment(format!("{pointer}/items")),
    })
}

/// Next schema to prune.
enum Target {
    /// A named model.
    Model(String),
    /// An inline fragment, by pointer.
    Fragment(String),
}

struct Visit {
    target: Target,
    fields: Vec<String>,
    /// Pointer of the schema object holding the `$ref` that led here.
    referrer: Option<String>,
}

impl Visit {
    fn model(name: &str, fields: Vec<String>, referrer: String) -> Self {
        Visit {
            target: Target::Model(name.to_string()),
            fields,
            referrer: Some(referrer),
        }
    }

    fn fragment(pointer: String, fields: Vec<String>) -> Self {
        Visit {
            target: Target::Fragment(pointer),
            fields,
            referrer: None,
        }
    }
}

fn field_key(fields: &[String]) -> Vec<String> {
    let mut key = fields.to_vec();
    key.sort();
    key.dedup();
    key
}

/// First free `<name>_<n>` model name.
fn specialized_name(schemas: &Value, name: &str) -> String {
    (2..)
        .map(|n| format!("{name}_{n}"))
        .find(|candidate| schemas.get(candidate).is_none())
        .unwrap_or_else(|| name.to_string())
}

fn repoint(schemas: &mut Value, referrer: &str, name: &str) {
    if let Some(Value::Object(holder)) = schemas.pointer_mut(referrer) {
        holder.insert(
            "$ref".to_string(),
            Value::String(format!("{MODEL_REF_PREFIX}{name}")),
        );
    }
}

/// Prune `required` in every schema reachable from `model`.
///
/// `schemas` is the `components.schemas` object of a document; it is
/// modified in place, so callers must pass a private copy. `fields` are
/// dotted paths in response (public) naming. A `required` entry survives
/// only when the first segment of some requested path at that level names
/// it. Unknown models and dangling references are skipped.
///
/// A named model reached again with a different field set is pruned as a
/// copy of its unpruned form, stored as `<name>_<n>`, and the `$ref` that
/// led there is repointed to the copy. Each model keeps exactly the
/// constraints of the paths that reach it.
pub fn intersect_required(schemas: &mut Value, model: &str, fields: &[String]) {
    let pristine = schemas.clone();
    let mut queue: VecDeque<Visit> = VecDeque::new();
    queue.push_back(Visit {
        target: Target::Model(model.to_string()),
        fields: fields.to_vec(),
        referrer: None,
    });
    let mut specialized: HashMap<(String, Vec<String>), String> = HashMap::new();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut visited: HashSet<(String, Vec<String>)> = HashSet::new();

    while let Some(Visit {
        target,
        fields,
        referrer,
    }) = queue.pop_front()
    {
        let key = field_key(&fields);
        let pointer = match target {
            Target::Fragment(pointer) => {
                if !visited.insert((pointer.clone(), key)) {
                    continue;
                }
                pointer
            }
            Target::Model(name) => {
                if let Some(existing) = specialized.get(&(name.clone(), key.clone())) {
                    if let Some(referrer) = &referrer {
                        repoint(schemas, referrer, existing);
                    }
                    continue;
                }
                let Some(original) = pristine.get(&name) else {
                    trace!(model = %name, "intersection target not found");
                    continue;
                };
                let assigned = if claimed.insert(name.clone()) {
                    name.clone()
                } else {
                    let copy = specialized_name(schemas, &name);
                    if let Some(models) = schemas.as_object_mut() {
                        models.insert(copy.clone(), original.clone());
                    }
                    if let Some(referrer) = &referrer {
                        repoint(schemas, referrer, &copy);
                    }
                    trace!(model = %name, %copy, "specialized model for another field set");
                    copy
                };
                let pointer = model_pointer(&assigned);
                specialized.insert((name, key), assigned);
                pointer
            }
        };

        let Some(schema) = schemas.pointer_mut(&pointer) else {
            trace!(%pointer, "intersection target not found");
            continue;
        };
        trace!(%pointer, fields = fields.len(), "intersecting required fields");

        let level: HashSet<&str> = fields
            .iter()
            .map(|field| field.split('.').next().unwrap_or(field))
            .collect();
        if let Some(Value::Array(required)) = schema.get_mut("required") {
            required.retain(|name| name.as_str().is_some_and(|name| level.contains(name)));
        }

        let mut next: Vec<Visit> = Vec::new();

        for (base, suffixes) in nested_groups(&fields) {
            let Some(property) = schema.get("properties").and_then(|p| p.get(&base)) else {
                continue;
            };
            let property_pointer = format!("{pointer}/properties/{}", escape_token(&base));
            match reference_of(property) {
                Some(reference) => {
                    if let Some(name) = reference_name(reference) {
                        next.push(Visit::model(name, suffixes, property_pointer));
                    }
                }
                None if is_array(property) => {
                    match items_target(&property_pointer, property) {
                        Some(Target::Model(name)) => next.push(Visit::model(
                            &name,
                            suffixes,
                            format!("{property_pointer}/items"),
                        )),
                        Some(Target::Fragment(items)) => {
                            next.push(Visit::fragment(items, suffixes))
                        }
                        None => {}
                    }
                }
                None => next.push(Visit::fragment(property_pointer, suffixes)),
            }
        }

        if let Some(name) = reference_of(schema).and_then(reference_name) {
            next.push(Visit::model(name, fields.clone(), pointer.clone()));
        }

        if is_array(schema) {
            match items_target(&pointer, schema) {
                Some(Target::Model(name)) => next.push(Visit::model(
                    &name,
                    fields.clone(),
                    format!("{pointer}/items"),
                )),
                Some(Target::Fragment(items)) => {
                    next.push(Visit::fragment(items, fields.clone()))
                }
                None => {}
            }
        }

        if let Some(Value::Array(parts)) = schema.get("allOf") {
            for (index, part) in parts.iter().enumerate() {
                let part_pointer = format!("{pointer}/allOf/{index}");
                match reference_of(part).and_then(reference_name) {
                    Some(name) => next.push(Visit::model(name, fields.clone(), part_pointer)),
                    None => next.push(Visit::fragment(part_pointer, fields.clone())),
                }
            }
        }

        queue.extend(next);
    }
}
