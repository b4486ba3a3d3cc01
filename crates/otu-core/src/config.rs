//! Service configuration
//!
//! Loaded from TOML. Missing keys fall back to [`ServiceConfig::default`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// OTU service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Length of generated OTU and isolate ids
    pub id_length: usize,
    /// Page size when a find query gives none
    pub default_per_page: usize,
    /// Largest page size a find query may request
    pub max_per_page: usize,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id_length: 8,
            default_per_page: 25,
            max_per_page: 100,
            log_filter: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With generated id length
    #[inline]
    #[must_use]
    pub fn with_id_length(mut self, id_length: usize) -> Self {
        self.id_length = id_length;
        self
    }

    /// With default and maximum page sizes
    #[inline]
    #[must_use]
    pub fn with_paging(mut self, default_per_page: usize, max_per_page: usize) -> Self {
        self.default_per_page = default_per_page;
        self.max_per_page = max_per_page;
        self
    }

    /// With log filter directive
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_length < 4 {
            return Err(ConfigError::Invalid("id_length must be at least 4".to_string()));
        }
        if self.default_per_page == 0 || self.max_per_page == 0 {
            return Err(ConfigError::Invalid("page sizes must be positive".to_string()));
        }
        if self.default_per_page > self.max_per_page {
            return Err(ConfigError::Invalid(
                "default_per_page exceeds max_per_page".to_string(),
            ));
        }
        Ok(())
    }
}
