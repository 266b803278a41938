//! Request-level operations: list, detail, meta and schema.
//!
//! A [`Gateway`] owns the configuration and the collaborators shared by all
//! requests (schema cache and remote schema fetcher). Entities are supplied
//! per call, so the same gateway serves any entity index.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::entity::{entity_meta, resolve_entity, RemoteEntity};
use crate::error::{GatewayError, LoadError, RemoteError};
use crate::fields::classify_query;
use crate::listing::{assemble, ListLink, ListPage};
use crate::loader::{SchemaCache, SchemaFetcher};
use crate::pagination::parse_limit;
use crate::types::{FieldSet, Segment};
use crate::validator::{pruned_schema, ModelValidator};

/// Client parameters of a list request, as received.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListQuery<'a> {
    /// Raw `fields` values; each may be comma-joined.
    pub fields: &'a [String],
    pub limit: Option<&'a str>,
    pub start_with: Option<&'a str>,
}

/// A single resolved entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    pub item: Value,
    /// Soft validation messages; the transport turns these into a warning
    /// header.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn not_accessible(segment: &Segment, err: &RemoteError) -> GatewayError {
    GatewayError::NotAccessible {
        noun: segment.noun,
        message: err.item_message(segment.noun),
        original: err.original_message().to_string(),
    }
}

/// Entity with `address` in `entities`.
///
/// # Errors
///
/// Returns `GatewayError::NotFound` if no entity has that address.
pub fn lookup<'e, E: RemoteEntity>(
    segment: &Segment,
    entities: &'e [E],
    address: &str,
) -> Result<&'e E, GatewayError> {
    entities
        .iter()
        .find(|entity| entity.address() == address)
        .ok_or_else(|| GatewayError::NotFound {
            noun: segment.noun,
            address: address.to_string(),
        })
}

pub struct Gateway<'c> {
    config: GatewayConfig,
    cache: &'c SchemaCache,
    fetcher: Box<dyn SchemaFetcher>,
}

impl Gateway<'static> {
    /// Gateway using the process-wide schema cache.
    ///
    /// Remote schemas are fetched over HTTP when the `remote` feature is
    /// enabled and refused otherwise.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Misconfiguration` if the configuration is
    /// inconsistent.
    pub fn new(config: GatewayConfig) -> Result<Self, LoadError> {
        config.validate()?;

        #[cfg(feature = "remote")]
        let fetcher: Box<dyn SchemaFetcher> = Box::new(crate::loader::HttpSchemaFetcher);
        #[cfg(not(feature = "remote"))]
        let fetcher: Box<dyn SchemaFetcher> = Box::new(crate::loader::OfflineFetcher);

        Ok(Self {
            config,
            cache: SchemaCache::global(),
            fetcher,
        })
    }
}

impl<'c> Gateway<'c> {
    /// Use a private schema cache instead of the process-wide one.
    pub fn with_cache<'d>(self, cache: &'d SchemaCache) -> Gateway<'d> {
        Gateway {
            config: self.config,
            cache,
            fetcher: self.fetcher,
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl SchemaFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Validator for `fields`, or `None` if the segment doesn't validate.
    async fn validator(
        &self,
        segment: &Segment,
        fields: &FieldSet,
    ) -> Result<Option<ModelValidator>, GatewayError> {
        let Some(model) = segment.schema_model else {
            return Ok(None);
        };
        let document = self
            .cache
            .load(&self.config.schema_path, self.fetcher.as_ref())
            .await?;
        let validator = ModelValidator::new(
            &document,
            model,
            segment.noun,
            &self.config.data_format_version,
            fields,
            &segment.mapper(),
        )?;
        Ok(Some(validator))
    }

    /// One page of `entities`.
    ///
    /// # Errors
    ///
    /// Fails only for request-level problems: a bad limit or cursor, or an
    /// unusable schema. Entity failures are reported inside the page.
    pub async fn list<E: RemoteEntity>(
        &self,
        segment: &Segment,
        entities: &[E],
        query: ListQuery<'_>,
    ) -> Result<ListPage, GatewayError> {
        let limit = parse_limit(
            query.limit,
            self.config.default_page_size,
            self.config.max_page_size,
        )?;
        let fields = classify_query(segment, query.fields, segment.default_list_fields);
        debug!(
            collection = segment.collection,
            limit,
            fields = %fields.query_value(),
            "list request"
        );

        let validator = self.validator(segment, &fields).await?;
        let path = format!("/{}", segment.collection);
        let link = ListLink {
            base_url: &self.config.base_url,
            path: &path,
        };
        let page = assemble(
            segment,
            entities,
            &fields,
            validator.as_ref(),
            limit,
            query.start_with,
            link,
        )
        .await?;
        Ok(page)
    }

    /// Resolve one entity with the detail defaults or the requested fields.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotAccessible` if the entity data cannot be
    /// read and `GatewayError::Validation` on a hard validation failure.
    pub async fn find<E: RemoteEntity + ?Sized>(
        &self,
        segment: &Segment,
        entity: &E,
        raw_fields: &[String],
    ) -> Result<Detail, GatewayError> {
        let fields = classify_query(segment, raw_fields, segment.default_detail_fields);
        let item = resolve_entity(segment, entity, &fields)
            .await
            .map_err(|err| not_accessible(segment, &err))?;
        let item = Value::Object(item);

        let mut warnings = Vec::new();
        if let Some(validator) = self.validator(segment, &fields).await? {
            match validator.validate(&item) {
                Ok(()) => {}
                Err(failure) if failure.soft => warnings = failure.messages(),
                Err(failure) => {
                    return Err(GatewayError::Validation {
                        failure,
                        data: item,
                    })
                }
            }
        }
        Ok(Detail { item, warnings })
    }

    /// Storage references of one entity.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotAccessible` if the data index cannot be read.
    pub async fn meta<E: RemoteEntity + ?Sized>(
        &self,
        segment: &Segment,
        entity: &E,
    ) -> Result<Value, GatewayError> {
        entity_meta(segment, entity)
            .await
            .map_err(|err| not_accessible(segment, &err))
    }

    /// The schema items of a detail request with `raw_fields` are checked
    /// against, or `None` if the segment doesn't validate.
    pub async fn schema(
        &self,
        segment: &Segment,
        raw_fields: &[String],
    ) -> Result<Option<Value>, GatewayError> {
        let Some(model) = segment.schema_model else {
            return Ok(None);
        };
        let fields = classify_query(segment, raw_fields, segment.default_detail_fields);
        let document = self
            .cache
            .load(&self.config.schema_path, self.fetcher.as_ref())
            .await?;
        Ok(Some(pruned_schema(
            &document,
            model,
            &fields,
            &segment.mapper(),
        )?))
    }
}
