//! # Configuration
//!
//! Pool manager settings, loadable from TOML or RON files.
//!
//! ```toml
//! auto_load_count = 2
//! warn_on_auto_load = true
//! container_prefix = "[Pool] "
//!
//! [[preload]]
//! key = "prefabs/asteroid"
//! count = 32
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A key to load eagerly, with its initial instance count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadEntry {
    /// Asset key of the prefab
    pub key: String,
    /// Instances to create up front
    pub count: usize,
}

/// # Pool Manager Configuration
///
/// Controls auto-loading on spawn, idle container naming, and which keys are
/// warmed up by [`PoolManager::preload`](crate::pool::PoolManager::preload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances created when spawning into a prototype with no pool
    pub auto_load_count: usize,

    /// Log a warning when a spawn has to create its pool
    pub warn_on_auto_load: bool,

    /// Prefix for the names of idle containers
    pub container_prefix: String,

    /// Keys to load on [`preload`](crate::pool::PoolManager::preload)
    pub preload: Vec<PreloadEntry>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            auto_load_count: 1,
            warn_on_auto_load: true,
            container_prefix: "[Pool] ".to_string(),
            preload: Vec::new(),
        }
    }
}

impl Config for PoolConfig {}

impl PoolConfig {
    /// Set the auto-load count
    pub fn with_auto_load_count(mut self, count: usize) -> Self {
        self.auto_load_count = count;
        self
    }

    /// Enable or disable the auto-load warning
    pub fn with_auto_load_warning(mut self, enabled: bool) -> Self {
        self.warn_on_auto_load = enabled;
        self
    }

    /// Set the idle container name prefix
    pub fn with_container_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.container_prefix = prefix.into();
        self
    }

    /// Add a key to preload
    pub fn with_preload(mut self, key: impl Into<String>, count: usize) -> Self {
        self.preload.push(PreloadEntry {
            key: key.into(),
            count,
        });
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_load_count == 0 {
            return Err(ConfigError::Invalid(
                "auto_load_count must be at least 1 so a spawn can be satisfied".to_string(),
            ));
        }

        if let Some(entry) = self.preload.iter().find(|entry| entry.key.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "preload entry with count {} has an empty key",
                entry.count
            )));
        }

        Ok(())
    }
}
