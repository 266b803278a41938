//! Remote entities and resolution of their requested fields.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{RemoteError, ValidationFailure};
use crate::flatten::{flatten, storage_contents, storage_reference};
use crate::types::{FieldSet, Segment, DESCRIPTION_ROOT, FORMAT_VERSION_FIELD, ID_FIELD};

/// Key of the data index pointer in an entity's plain object.
pub const DATA_INDEX_KEY: &str = "dataUri";

/// An addressable record in the on-chain index.
///
/// Implementations talk to the chain and to off-chain storage. Every failure
/// is reported as a [`RemoteError`] variant.
#[async_trait]
pub trait RemoteEntity: Send + Sync {
    /// Stable address of the entity, also its pagination cursor.
    fn address(&self) -> &str;

    /// Read one on-chain property. `Ok(None)` means the entity has no such
    /// property.
    async fn on_chain(&self, name: &str) -> Result<Option<Value>, RemoteError>;

    /// Fetch the off-chain data tree needed for `fields`.
    ///
    /// Returns `{ "address": ..., "dataUri": { "ref": ..., "contents": ... } }`
    /// where the contents hold further storage pointers
    /// (`descriptionUri`, `ratePlansUri`, ...).
    async fn to_plain_object(&self, fields: &[String]) -> Result<Value, RemoteError>;
}

/// An item that could not be served, as reported in list responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    pub error: String,
    #[serde(rename = "originalError")]
    pub original_error: Value,
    pub data: Value,
}

impl ItemError {
    /// Error for an entity whose data could not be read.
    pub fn remote(segment: &Segment, address: &str, error: &RemoteError) -> Self {
        Self {
            error: error.item_message(segment.noun),
            original_error: Value::String(error.original_message().to_string()),
            data: json!({ ID_FIELD: address }),
        }
    }

    /// Error or warning for a resolved item that failed validation.
    ///
    /// `originalError.valid` is `true` for soft failures.
    pub fn validation(segment: &Segment, failure: &ValidationFailure, data: Value) -> Self {
        Self {
            error: format!(
                "Upstream {} data format validation failed: {failure}",
                segment.noun
            ),
            original_error: json!({
                "valid": failure.soft,
                "errors": failure.messages(),
            }),
            data,
        }
    }
}

/// Resolve the requested fields of one entity into a response object.
///
/// Off-chain documents are fetched only when `fields.to_flatten` is not
/// empty. The returned object always carries `id`.
pub async fn resolve_entity<E>(
    segment: &Segment,
    entity: &E,
    fields: &FieldSet,
) -> Result<Map<String, Value>, RemoteError>
where
    E: RemoteEntity + ?Sized,
{
    let mut data = Map::new();

    if !fields.to_flatten.is_empty() {
        let plain = entity.to_plain_object(&fields.to_flatten).await?;
        let contents = plain
            .get(DATA_INDEX_KEY)
            .map(storage_contents)
            .ok_or_else(|| RemoteError::StoragePointer {
                message: format!("{} has no data index", entity.address()),
            })?;

        if let Some(version) = contents.get(FORMAT_VERSION_FIELD) {
            data.insert(FORMAT_VERSION_FIELD.to_string(), version.clone());
        }

        let flattened = flatten(contents, &fields.to_flatten);
        if let Some(Value::Object(description)) = flattened.get(DESCRIPTION_ROOT) {
            data.extend(description.clone());
        }
        for root in segment.document_roots {
            if let Some(value) = flattened.get(root.internal) {
                data.insert(root.response_key.to_string(), value.clone());
            }
        }
    }

    for name in &fields.on_chain {
        if let Some(value) = entity.on_chain(name).await? {
            data.insert(name.clone(), value);
        }
    }

    data.insert(
        ID_FIELD.to_string(),
        Value::String(entity.address().to_string()),
    );

    Ok(segment.mapper().map_response(data))
}

/// Storage references of an entity's data index.
pub async fn entity_meta<E>(segment: &Segment, entity: &E) -> Result<Value, RemoteError>
where
    E: RemoteEntity + ?Sized,
{
    let plain = entity.to_plain_object(&[]).await?;
    let pointer = plain
        .get(DATA_INDEX_KEY)
        .ok_or_else(|| RemoteError::StoragePointer {
            message: format!("{} has no data index", entity.address()),
        })?;
    let contents = storage_contents(pointer);

    let mut meta = Map::new();
    meta.insert(
        "address".to_string(),
        Value::String(entity.address().to_string()),
    );
    if let Some(reference) = storage_reference(pointer) {
        meta.insert(DATA_INDEX_KEY.to_string(), Value::String(reference.to_string()));
    }
    for root in segment.meta_roots {
        let Some(value) = contents.get(*root) else {
            continue;
        };
        let reference = storage_reference(value)
            .map(str::to_string)
            .map(Value::String)
            .unwrap_or_else(|| value.clone());
        meta.insert((*root).to_string(), reference);
    }
    if let Some(version) = contents.get(FORMAT_VERSION_FIELD) {
        meta.insert(FORMAT_VERSION_FIELD.to_string(), version.clone());
    }
    Ok(Value::Object(meta))
}
