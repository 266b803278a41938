//! Error types for configuration, schema loading, remote reads, pagination
//! and validation.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Errors while loading, fetching or preparing schema documents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {uri}: {message}")]
    Fetch { uri: String, message: String },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {source}")]
    InvalidConfig {
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid schema document: {message}")]
    InvalidDocument { message: String },

    #[error("misconfiguration: {message}")]
    Misconfiguration { message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. }
            | LoadError::ReadError { .. }
            | LoadError::Fetch { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Failure reported by a remote entity while reading its data.
///
/// The entity collaborator tags every failure with one of these variants so
/// the resolver can pick a message without inspecting error types.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// An on-chain property could not be read.
    #[error("remote data read failed: {message}")]
    RemoteRead { message: String },

    /// An off-chain document behind a storage pointer could not be fetched.
    #[error("storage pointer failed: {message}")]
    StoragePointer { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl RemoteError {
    /// Message reported to API clients for the given segment noun ("hotel").
    pub fn item_message(&self, noun: &str) -> String {
        match self {
            RemoteError::RemoteRead { .. } => {
                "Cannot access on-chain data, maybe the deployed smart contract is broken"
                    .to_string()
            }
            RemoteError::StoragePointer { .. } => "Cannot access off-chain data".to_string(),
            RemoteError::Other { .. } => format!("Cannot get {noun} data"),
        }
    }

    /// The underlying message without the variant prefix.
    pub fn original_message(&self) -> &str {
        match self {
            RemoteError::RemoteRead { message }
            | RemoteError::StoragePointer { message }
            | RemoteError::Other { message } => message,
        }
    }
}

/// Request-level pagination errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("Limit must be a natural number greater than 0, got \"{value}\".")]
    InvalidLimit { value: String },

    #[error("Cannot find startWith \"{start_with}\" in the collection.")]
    StartNotFound { start_with: String },
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl SchemaError {
    /// Error not tied to a particular location in the item.
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A resolved item that did not pass the data format checks.
///
/// Soft failures (a parseable item in an unsupported format version) still
/// surface the item with warnings; hard failures block it.
#[derive(Debug, Clone, Error)]
#[error("{}", joined(.errors))]
pub struct ValidationFailure {
    pub soft: bool,
    pub errors: Vec<SchemaError>,
}

impl ValidationFailure {
    pub fn hard(errors: Vec<SchemaError>) -> Self {
        Self {
            soft: false,
            errors,
        }
    }

    pub fn soft(errors: Vec<SchemaError>) -> Self {
        Self { soft: true, errors }
    }

    /// Error messages as plain strings.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

fn joined(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that abort a whole gateway request.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Single-entity validation failed hard.
    #[error("{failure}")]
    Validation {
        failure: ValidationFailure,
        data: Value,
    },

    /// The entity data could not be read from its sources.
    #[error("{message}")]
    NotAccessible {
        noun: &'static str,
        message: String,
        original: String,
    },

    #[error("{noun} {address} not found")]
    NotFound {
        noun: &'static str,
        address: String,
    },
}

impl GatewayError {
    /// HTTP status the transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Pagination(PaginationError::InvalidLimit { .. }) => 422,
            GatewayError::Pagination(PaginationError::StartNotFound { .. }) => 404,
            GatewayError::Validation { .. } => 422,
            GatewayError::NotAccessible { .. } => 502,
            GatewayError::NotFound { .. } => 404,
            GatewayError::Load(_) => 500,
        }
    }

    /// Stable error code for the response body.
    pub fn code(&self) -> String {
        match self {
            GatewayError::Pagination(PaginationError::InvalidLimit { .. }) => {
                "#paginationLimitError".to_string()
            }
            GatewayError::Pagination(PaginationError::StartNotFound { .. }) => {
                "#paginationStartWithError".to_string()
            }
            GatewayError::Validation { .. } => "#validationFailed".to_string(),
            GatewayError::NotAccessible { noun, .. } => format!("#{noun}NotAccessible"),
            GatewayError::NotFound { noun, .. } => format!("#{noun}NotFound"),
            GatewayError::Load(LoadError::Misconfiguration { .. }) => {
                "#misconfiguration".to_string()
            }
            GatewayError::Load(_) => "#schemaUnavailable".to_string(),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GatewayError::Validation { .. } => 1,
            GatewayError::Pagination(_) | GatewayError::NotFound { .. } => 2,
            GatewayError::NotAccessible { .. } => 3,
            GatewayError::Load(e) => e.exit_code(),
        }
    }
}
