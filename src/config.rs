//! Gateway configuration.
//!
//! Every key is optional:
//!
//! ```toml
//! base_url = "https://api.example.com"
//! schema_path = "docs/swagger.yaml"
//! data_format_version = "0.2.0"
//! default_page_size = 30
//! max_page_size = 300
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::types::{DATA_FORMAT_VERSION, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Settings shared by every request of a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Prefix of generated `next` links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Schema document, a file path or an HTTP(S) URL.
    #[serde(default = "default_schema_path")]
    pub schema_path: String,

    /// The only data format version items are accepted in.
    #[serde(default = "default_data_format_version")]
    pub data_format_version: String,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "max_page_size")]
    pub max_page_size: usize,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_schema_path() -> String {
    "docs/swagger.yaml".to_string()
}

fn default_data_format_version() -> String {
    DATA_FORMAT_VERSION.to_string()
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

const fn max_page_size() -> usize {
    MAX_PAGE_SIZE
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            schema_path: default_schema_path(),
            data_format_version: default_data_format_version(),
            default_page_size: default_page_size(),
            max_page_size: max_page_size(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidConfig` for malformed TOML or unknown keys,
    /// `LoadError::Misconfiguration` if the values are inconsistent.
    pub fn from_toml(content: &str) -> Result<Self, LoadError> {
        let config: Self =
            toml::from_str(content).map_err(|source| LoadError::InvalidConfig { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can serve requests.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.data_format_version.trim().is_empty() {
            return Err(LoadError::Misconfiguration {
                message: "data_format_version is not configured".to_string(),
            });
        }
        if self.max_page_size == 0 || self.default_page_size == 0 {
            return Err(LoadError::Misconfiguration {
                message: "page sizes must be greater than 0".to_string(),
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(LoadError::Misconfiguration {
                message: format!(
                    "default_page_size {} exceeds max_page_size {}",
                    self.default_page_size, self.max_page_size
                ),
            });
        }
        Ok(())
    }
}
