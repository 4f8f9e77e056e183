//! Batch configuration
//!
//! TOML-backed settings for the scene, registry discovery, checkout and
//! logging. Every field has a default, so an empty file is a valid config.
//!
//! ```toml
//! [scene]
//! extensions = ["ma", "mb"]
//!
//! [registry]
//! packages = ["core"]
//!
//! [checkout]
//! enabled = true
//! order = "after-open"
//! edit_command = ["p4", "edit"]
//! add_command = ["p4", "add"]
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use crate::checkout::CheckoutOrder;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file name looked up by the CLI
pub const CONFIG_FILE_NAME: &str = "scene-batch.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Scene handle settings
    pub scene: SceneConfig,
    /// Task discovery settings
    pub registry: RegistryConfig,
    /// Version-control settings
    pub checkout: CheckoutConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

impl BatchConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML or wrong field types
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` if it exists, defaults otherwise
    ///
    /// # Errors
    /// Returns [`ConfigError`] when an existing file is malformed
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// With scene extensions
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scene.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// With discovery packages
    #[must_use]
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// With checkout enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_checkout(mut self, enabled: bool) -> Self {
        self.checkout.enabled = enabled;
        self
    }

    /// With log level
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }
}

/// Scene handle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Document extensions the scene can open, without the dot
    pub extensions: Vec<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            extensions: ["ma", "mb", "max", "fbx"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Task discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registration packages, scanned in order
    pub packages: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            packages: vec!["core".to_string()],
        }
    }
}

/// Version-control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Check out each file before it is processed
    pub enabled: bool,
    /// Checkout position relative to opening the file
    pub order: CheckoutOrder,
    /// Command line that opens a file for edit
    pub edit_command: Vec<String>,
    /// Command line that marks a new file for add
    pub add_command: Vec<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            order: CheckoutOrder::BeforeOpen,
            edit_command: vec!["p4".to_string(), "edit".to_string()],
            add_command: vec!["p4".to_string(), "add".to_string()],
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
