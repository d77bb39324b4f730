//! Configuration management
//!
//! Settings are read from `.cidflow.yaml` in the project directory. Every
//! field is optional; command-line flags take precedence.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file looked up in the project directory
pub const CONFIG_FILE: &str = ".cidflow.yaml";

/// How a plan is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Human-readable stage listing
    Text,
}

/// Errors reading a configuration file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but cannot be read
    #[error("failed to read config '{path}': {reason}")]
    Io {
        /// Config path.
        path: String,
        /// Underlying error.
        reason: String,
    },

    /// The file is not valid YAML for [`Config`]
    #[error("invalid config '{path}': {reason}")]
    Parse {
        /// Config path.
        path: String,
        /// Underlying error.
        reason: String,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Catalog files, merged in order
    pub catalogs: Vec<PathBuf>,
    /// Module list produced by repository analysis
    pub modules: Option<PathBuf>,
    /// Default plan output format
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            catalogs: Vec::new(),
            modules: None,
            format: OutputFormat::Json,
        }
    }
}

impl Config {
    /// Reads a configuration file
    ///
    /// Relative catalog and module paths are resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            config.catalogs = config.catalogs.iter().map(|p| base.join(p)).collect();
            config.modules = config.modules.map(|p| base.join(p));
        }
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Loads `.cidflow.yaml` from `project_dir`, or defaults if absent
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but is invalid.
    pub fn discover(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
