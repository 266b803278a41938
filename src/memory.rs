//! In-memory entity index backed by a JSON fixture.
//!
//! The fixture lists entities per collection:
//!
//! ```json
//! {
//!   "hotels": [
//!     {
//!       "address": "0x...",
//!       "onChain": { "manager": "0x..." },
//!       "dataUri": { "ref": "in-memory://...", "contents": { "descriptionUri": { ... } } }
//!     }
//!   ]
//! }
//! ```
//!
//! `onChainError` and `offChainError` make the respective reads fail, which
//! is how broken contracts and unreachable storage are simulated.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::entity::{RemoteEntity, DATA_INDEX_KEY};
use crate::error::{LoadError, RemoteError};

/// One entity of the fixture.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntity {
    pub address: String,
    #[serde(default)]
    pub on_chain: Map<String, Value>,
    #[serde(default)]
    pub data_uri: Option<Value>,
    #[serde(default)]
    pub on_chain_error: Option<String>,
    #[serde(default)]
    pub off_chain_error: Option<String>,
}

#[async_trait]
impl RemoteEntity for MemoryEntity {
    fn address(&self) -> &str {
        &self.address
    }

    async fn on_chain(&self, name: &str) -> Result<Option<Value>, RemoteError> {
        if let Some(message) = &self.on_chain_error {
            return Err(RemoteError::RemoteRead {
                message: message.clone(),
            });
        }
        Ok(self.on_chain.get(name).cloned())
    }

    async fn to_plain_object(&self, _fields: &[String]) -> Result<Value, RemoteError> {
        if let Some(message) = &self.off_chain_error {
            return Err(RemoteError::StoragePointer {
                message: message.clone(),
            });
        }
        let data_uri = self
            .data_uri
            .clone()
            .ok_or_else(|| RemoteError::StoragePointer {
                message: format!("no data index for {}", self.address),
            })?;
        Ok(json!({ "address": self.address, DATA_INDEX_KEY: data_uri }))
    }
}

/// Entities grouped by collection name, in index order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MemoryIndex {
    collections: HashMap<String, Vec<MemoryEntity>>,
}

impl MemoryIndex {
    /// Load an index fixture from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::FileNotFound` if the file doesn't exist,
    /// or `LoadError::InvalidJson` if it isn't a valid fixture.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse an index fixture from a JSON string.
    pub fn parse(content: &str) -> Result<Self, LoadError> {
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
    }

    /// All entities of a collection; unknown collections are empty.
    pub fn collection(&self, name: &str) -> &[MemoryEntity] {
        self.collections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
