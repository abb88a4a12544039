//! Configuration loading and resolution
//!
//! Configuration file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`LRMM_CONFIG`)
//! 3. User config file (`<config dir>/lrmm/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable file never aborts startup: the caller gets the
//! compiled defaults plus the reason, and logs it once tracing is up.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "LRMM_CONFIG";

/// Complete configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where the sidecar document and artifacts live inside a recording
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Settings forwarded to the artifact renderer
    #[serde(default)]
    pub render: RenderConfig,

    /// Marker session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Sidecar layout relative to the recording directory
///
/// With the defaults the document is `<recording>/mra/marks.xml` and the
/// artifacts live in `<recording>/mra/markers/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Derived-data directory inside the recording
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Sidecar document file name inside `data_dir`
    #[serde(default = "default_document_name")]
    pub document_name: String,

    /// Artifact directory name inside `data_dir`
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            document_name: default_document_name(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// Rendering parameters handed to the artifact renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Global colour map name; `None` lets the renderer map colours per image
    #[serde(default)]
    pub color_map: Option<String>,

    /// Intensity normalization factor
    #[serde(default = "default_normalization")]
    pub normalization: f64,

    /// Time-varying gain
    #[serde(default = "default_tvg_gain")]
    pub tvg_gain: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color_map: None,
            normalization: default_normalization(),
            tvg_gain: default_tvg_gain(),
        }
    }
}

/// Marker session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Event bus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "mra".to_string()
}

fn default_document_name() -> String {
    "marks.xml".to_string()
}

fn default_artifact_dir() -> String {
    "markers".to_string()
}

fn default_normalization() -> f64 {
    0.2
}

fn default_tvg_gain() -> f64 {
    280.0
}

fn default_event_capacity() -> usize {
    100
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfig(PathBuf),
    Defaults,
}

impl ConfigSource {
    /// Configuration file path, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::CommandLine(p) | Self::Environment(p) | Self::UserConfig(p) => Some(p),
            Self::Defaults => None,
        }
    }
}

/// Result of configuration resolution
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
    /// Why compiled defaults were used instead of the located file
    pub fallback_reason: Option<String>,
}

impl LoadedConfig {
    /// Log where the configuration came from (call after tracing init)
    pub fn log_summary(&self) {
        match (&self.source, &self.fallback_reason) {
            (_, Some(reason)) => warn!("{}; using built-in defaults", reason),
            (ConfigSource::Defaults, None) => info!("No configuration file found, using built-in defaults"),
            (source, None) => {
                if let Some(path) = source.path() {
                    info!("Loaded configuration from {}", path.display());
                }
            }
        }
    }
}

/// Locates and loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env_var: String,
    user_config: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver using `LRMM_CONFIG` and the platform config directory
    pub fn new() -> Self {
        Self {
            env_var: CONFIG_ENV_VAR.to_string(),
            user_config: dirs::config_dir().map(|d| d.join("lrmm").join("config.toml")),
        }
    }

    /// Override the user config file location
    pub fn with_user_config(mut self, path: Option<PathBuf>) -> Self {
        self.user_config = path;
        self
    }

    /// Determine which configuration file applies, without reading it
    pub fn locate(&self, cli_arg: Option<&Path>) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return ConfigSource::CommandLine(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        // Priority 3: User config file
        if let Some(path) = &self.user_config {
            if path.exists() {
                return ConfigSource::UserConfig(path.clone());
            }
        }

        // Priority 4: Compiled defaults
        ConfigSource::Defaults
    }

    /// Locate and parse the configuration, falling back to defaults on error
    pub fn load(&self, cli_arg: Option<&Path>) -> LoadedConfig {
        let source = self.locate(cli_arg);
        let (config, fallback_reason) = match source.path() {
            Some(path) => match TomlConfig::from_file(path) {
                Ok(config) => (config, None),
                Err(e) => (TomlConfig::default(), Some(e.to_string())),
            },
            None => (TomlConfig::default(), None),
        };

        LoadedConfig {
            config,
            source,
            fallback_reason,
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_default_layout() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.data_dir, "mra");
        assert_eq!(layout.document_name, "marks.xml");
        assert_eq!(layout.artifact_dir, "markers");
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [render]
            color_map = "bronze"

            [layout]
            document_name = "markers.xml"
            "#,
        )
        .unwrap();

        assert_eq!(config.render.color_map.as_deref(), Some("bronze"));
        assert_eq!(config.render.normalization, 0.2);
        assert_eq!(config.render.tvg_gain, 280.0);
        assert_eq!(config.layout.document_name, "markers.xml");
        assert_eq!(config.layout.data_dir, "mra");
        assert_eq!(config.session.event_capacity, 100);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[render\nnormalization = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
