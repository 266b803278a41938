//! Schema document loading from files, strings and HTTP URLs.
//!
//! Documents are OpenAPI-style: named models live under
//! `components.schemas`. Models may reference models of other documents by
//! absolute URI (`https://host/doc.yaml#/components/schemas/Currency`); those
//! documents are fetched once, their models merged into the main document
//! and the references rewritten to local fragments.
//!
//! Fully loaded documents are kept in a [`SchemaCache`]. Nothing handed out
//! by the cache may be mutated; callers clone before pruning.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::types::json_type_name;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches raw schema text for absolute schema URIs.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<String, LoadError>;
}

/// Fetcher for deployments without network access; every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

#[async_trait]
impl SchemaFetcher for OfflineFetcher {
    async fn fetch(&self, uri: &str) -> Result<String, LoadError> {
        Err(LoadError::Fetch {
            uri: uri.to_string(),
            message: "remote schema fetching is disabled".to_string(),
        })
    }
}

/// Fetcher backed by an HTTP client.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSchemaFetcher;

#[cfg(feature = "remote")]
#[async_trait]
impl SchemaFetcher for HttpSchemaFetcher {
    async fn fetch(&self, uri: &str) -> Result<String, LoadError> {
        load_schema_url(uri).await
    }
}

/// Fetch the text of an HTTP/HTTPS URL.
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the server
/// answers with an error status.
#[cfg(feature = "remote")]
pub async fn load_schema_url(url: &str) -> Result<String, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client.get(url).send().await.map_err(network_error)?;

    // Check for HTTP errors before reading the body
    let response = response.error_for_status().map_err(network_error)?;

    response.text().await.map_err(network_error)
}

/// Load a schema document from a file path.
///
/// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content doesn't match its format.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let document = if is_yaml {
        serde_yaml::from_str(&content).map_err(|source| LoadError::InvalidYaml { source })?
    } else {
        serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })?
    };
    expect_object(document)
}

/// Load a schema document from a string holding JSON or YAML.
///
/// # Errors
///
/// Returns `LoadError::InvalidYaml` if the string is neither, or
/// `LoadError::InvalidDocument` if it doesn't hold an object.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    let document = match serde_json::from_str(content) {
        Ok(document) => document,
        Err(_) => {
            serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })?
        }
    };
    expect_object(document)
}

fn expect_object(document: Value) -> Result<Value, LoadError> {
    if document.is_object() {
        Ok(document)
    } else {
        Err(LoadError::InvalidDocument {
            message: format!(
                "expected an object at the document root, got {}",
                json_type_name(&document)
            ),
        })
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Named models of a document (`components.schemas`).
pub fn models(document: &Value) -> Result<&Map<String, Value>, LoadError> {
    let schemas = document
        .get("components")
        .and_then(|components| components.get("schemas"))
        .ok_or_else(|| LoadError::InvalidDocument {
            message: "missing components.schemas".to_string(),
        })?;
    schemas.as_object().ok_or_else(|| LoadError::InvalidDocument {
        message: format!(
            "components.schemas must be an object, got {}",
            json_type_name(schemas)
        ),
    })
}

fn models_mut(document: &mut Value) -> Result<&mut Map<String, Value>, LoadError> {
    document
        .get_mut("components")
        .and_then(|components| components.get_mut("schemas"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| LoadError::InvalidDocument {
            message: "missing components.schemas".to_string(),
        })
}

/// Rewrite absolute `$ref`s to their local fragment.
///
/// Returns the distinct documents (URI without fragment) that were
/// referenced, in order of first appearance.
pub fn collect_remote_refs(value: &mut Value) -> Vec<String> {
    let mut documents = Vec::new();
    collect_remote_refs_inner(value, &mut documents);
    documents
}

fn collect_remote_refs_inner(value: &mut Value, documents: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(reference)) = obj.get_mut("$ref") {
                if is_url(reference) {
                    let (document, fragment) = match reference.find('#') {
                        Some(idx) => (reference[..idx].to_string(), reference[idx..].to_string()),
                        None => (reference.clone(), "#".to_string()),
                    };
                    if !documents.contains(&document) {
                        documents.push(document);
                    }
                    *reference = fragment;
                }
            }
            for child in obj.values_mut() {
                collect_remote_refs_inner(child, documents);
            }
        }
        Value::Array(arr) => {
            for item in arr {
                collect_remote_refs_inner(item, documents);
            }
        }
        _ => {}
    }
}

/// Fetch every remotely referenced document and merge its models in.
///
/// Referenced documents may reference further documents; each URI is
/// fetched at most once, so reference cycles terminate.
pub async fn inline_remote_refs(
    document: &mut Value,
    fetcher: &dyn SchemaFetcher,
) -> Result<(), LoadError> {
    let mut queue: VecDeque<String> = collect_remote_refs(document).into();
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(uri) = queue.pop_front() {
        if !visited.insert(uri.clone()) {
            continue;
        }
        info!(%uri, "fetching remote schema");
        let mut remote = load_schema_str(&fetcher.fetch(&uri).await?)?;
        queue.extend(collect_remote_refs(&mut remote));

        let remote_models = models(&remote)?.clone();
        let local_models = models_mut(document)?;
        for (name, model) in remote_models {
            local_models.insert(name, model);
        }
    }
    Ok(())
}

/// Process-wide cache of fully loaded schema documents, keyed by source.
///
/// Entries live until the process ends or [`SchemaCache::clear`] is called.
#[derive(Debug, Default)]
pub struct SchemaCache {
    documents: RwLock<HashMap<String, Arc<Value>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by the whole process.
    pub fn global() -> &'static SchemaCache {
        static GLOBAL: OnceLock<SchemaCache> = OnceLock::new();
        GLOBAL.get_or_init(SchemaCache::new)
    }

    /// Load `source` (file path or URL), inlining remote references.
    ///
    /// The first successful load of a source is cached; later calls return
    /// the cached document without touching the file system or network.
    pub async fn load(
        &self,
        source: &str,
        fetcher: &dyn SchemaFetcher,
    ) -> Result<Arc<Value>, LoadError> {
        let cached = self.documents.read().get(source).cloned();
        if let Some(document) = cached {
            debug!(source, "schema cache hit");
            return Ok(document);
        }

        debug!(source, "schema cache miss");
        let mut document = if is_url(source) {
            load_schema_str(&fetcher.fetch(source).await?)?
        } else {
            load_schema(Path::new(source))?
        };
        models(&document)?;
        inline_remote_refs(&mut document, fetcher).await?;

        let document = Arc::new(document);
        Ok(self
            .documents
            .write()
            .entry(source.to_string())
            .or_insert(document)
            .clone())
    }

    pub fn contains(&self, source: &str) -> bool {
        self.documents.read().contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Drop every cached document.
    pub fn clear(&self) {
        self.documents.write().clear();
    }
}
