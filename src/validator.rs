//! Validation of resolved items against a schema model.
//!
//! Each request builds its own [`ModelValidator`]: the shared document is
//! cloned, its `required` constraints pruned to the requested fields, and
//! the result compiled once for every item of the request.

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{LoadError, SchemaError, ValidationFailure};
use crate::intersect::{intersect_required, MODEL_REF_PREFIX};
use crate::loader::models;
use crate::mapping::FieldMapper;
use crate::types::{FieldSet, FORMAT_VERSION_FIELD, ID_FIELD};

/// Validator for one model, pruned to one request's fields.
pub struct ModelValidator {
    model: String,
    noun: &'static str,
    supported_version: String,
    /// Format gate is skipped when only the identifier was requested.
    check_version: bool,
    /// `None` when the document has no such model.
    compiled: Option<jsonschema::Validator>,
    schema: Value,
}

impl std::fmt::Debug for ModelValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelValidator")
            .field("model", &self.model)
            .field("supported_version", &self.supported_version)
            .field("check_version", &self.check_version)
            .finish_non_exhaustive()
    }
}

/// Clone the models of `document` and prune them for `fields`.
///
/// Returns a standalone document whose root references `model`.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` if the document has no models.
pub fn pruned_schema(
    document: &Value,
    model: &str,
    fields: &FieldSet,
    mapper: &FieldMapper,
) -> Result<Value, LoadError> {
    let mut schemas = Value::Object(models(document)?.clone());
    let public: Vec<String> = fields
        .mapped
        .iter()
        .map(|field| mapper.path_to_public(field))
        .collect();
    intersect_required(&mut schemas, model, &public);

    Ok(json!({
        "$ref": format!("{MODEL_REF_PREFIX}{model}"),
        "components": { "schemas": schemas },
    }))
}

impl ModelValidator {
    /// Build a validator for `model` limited to the requested `fields`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Misconfiguration` if no supported format version
    /// is configured, `LoadError::InvalidDocument` if the document has no
    /// models or the pruned schema does not compile.
    pub fn new(
        document: &Value,
        model: &str,
        noun: &'static str,
        supported_version: &str,
        fields: &FieldSet,
        mapper: &FieldMapper,
    ) -> Result<Self, LoadError> {
        if supported_version.trim().is_empty() {
            return Err(LoadError::Misconfiguration {
                message: "data format version is not configured, check the gateway deployment"
                    .to_string(),
            });
        }

        let schema = pruned_schema(document, model, fields, mapper)?;
        let has_model = models(&schema)?.contains_key(model);
        let compiled = if has_model {
            let validator =
                jsonschema::validator_for(&schema).map_err(|e| LoadError::InvalidDocument {
                    message: e.to_string(),
                })?;
            Some(validator)
        } else {
            debug!(model, "model not present in schema document");
            None
        };

        Ok(Self {
            model: model.to_string(),
            noun,
            supported_version: supported_version.to_string(),
            check_version: !fields.only_identifier(),
            compiled,
            schema,
        })
    }

    /// The pruned document this validator checks against.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Check a resolved item.
    ///
    /// A missing format version, an unknown model or a structural mismatch is
    /// a hard failure. A present but unsupported version is a soft failure
    /// and skips structural validation.
    pub fn validate(&self, item: &Value) -> Result<(), ValidationFailure> {
        if self.check_version {
            self.check_format_version(item)?;
        }

        let Some(compiled) = &self.compiled else {
            return Err(ValidationFailure::hard(vec![SchemaError::root(format!(
                "Model {} not found in schemas.",
                self.model
            ))]));
        };

        let errors: Vec<SchemaError> = compiled
            .iter_errors(item)
            .map(|e| SchemaError {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::hard(errors))
        }
    }

    fn check_format_version(&self, item: &Value) -> Result<(), ValidationFailure> {
        let Some(version) = item.get(FORMAT_VERSION_FIELD).filter(|v| !v.is_null()) else {
            let id = item.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default();
            return Err(ValidationFailure::hard(vec![SchemaError::root(format!(
                "Missing property `{FORMAT_VERSION_FIELD}` in {} data for id {id}",
                self.noun
            ))]));
        };

        if version.as_str() != Some(self.supported_version.as_str()) {
            let shown = version
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| version.to_string());
            return Err(ValidationFailure::soft(vec![SchemaError::root(format!(
                "Unsupported data format version {shown}. Supported versions: {}",
                self.supported_version
            ))]));
        }
        Ok(())
    }
}
