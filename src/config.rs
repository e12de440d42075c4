use log::{debug, warn};
use serde::Deserialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::error::{Result, VitalsError};

/// Collector settings loaded from configuration sources
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VitalsConfig {
    /// Name reported as the batch source
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,
    /// Channel buffer size
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Resources slower than this many milliseconds are flagged
    #[serde(default = "default_slow_resource_threshold_ms")]
    pub slow_resource_threshold_ms: f64,
    /// Initiator types watched for slow loads
    #[serde(default = "default_slow_resource_initiators")]
    pub slow_resource_initiators: Vec<String>,
    #[serde(default = "default_web_vitals_category")]
    pub web_vitals_category: String,
    #[serde(default = "default_performance_category")]
    pub performance_category: String,
}

fn default_name() -> String {
    "web_vitals".to_string()
}

fn default_buffer_size() -> usize {
    100
}

fn default_slow_resource_threshold_ms() -> f64 {
    1000.0
}

fn default_slow_resource_initiators() -> Vec<String> {
    vec!["img".to_string(), "css".to_string(), "script".to_string()]
}

fn default_web_vitals_category() -> String {
    "Web Vitals".to_string()
}

fn default_performance_category() -> String {
    "Performance".to_string()
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: LogLevel::default(),
            buffer_size: default_buffer_size(),
            slow_resource_threshold_ms: default_slow_resource_threshold_ms(),
            slow_resource_initiators: default_slow_resource_initiators(),
            web_vitals_category: default_web_vitals_category(),
            performance_category: default_performance_category(),
        }
    }
}

/// Logging level
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

/// Source of configuration
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// File path (TOML format)
    File(String),
    /// Environment variables with a prefix
    Environment(String),
    /// TOML string
    Toml(String),
    /// Default configuration
    Defaults,
}

/// Helper function to load configuration from various sources
pub fn load_config<T>(sources: Vec<ConfigSource>) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    let mut builder = config::Config::builder();

    // Later sources override earlier ones
    for source in sources {
        match source {
            ConfigSource::File(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    warn!("Configuration file not found: {}", path.display());
                    continue;
                }

                debug!("Loading TOML configuration from file: {}", path.display());
                builder = builder.add_source(
                    config::File::with_name(&path.to_string_lossy())
                        .format(config::FileFormat::Toml),
                );
            }
            ConfigSource::Environment(prefix) => {
                debug!("Loading configuration from environment with prefix: {}", prefix);
                builder = builder.add_source(
                    config::Environment::with_prefix(&prefix)
                        .separator("__")
                        .list_separator(",")
                        .with_list_parse_key("slow_resource_initiators")
                        .try_parsing(true),
                );
            }
            ConfigSource::Toml(toml_str) => {
                debug!("Loading configuration from TOML string");
                builder = builder.add_source(config::File::from_str(
                    &toml_str,
                    config::FileFormat::Toml,
                ));
            }
            ConfigSource::Defaults => {
                // Defaults come from the Deserialize implementation
                debug!("Using default configuration values");
            }
        }
    }

    let config = builder
        .build()
        .map_err(|e| VitalsError::Config(format!("Failed to build configuration: {}", e)))?;

    let result = config
        .try_deserialize()
        .map_err(|e| VitalsError::Config(format!("Failed to deserialize configuration: {}", e)))?;

    debug!("Configuration loaded successfully: {:?}", result);

    Ok(result)
}

/// Configuration builder
pub struct ConfigBuilder<T: for<'de> Deserialize<'de>> {
    sources: Vec<ConfigSource>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: for<'de> Deserialize<'de> + Debug> ConfigBuilder<T> {
    /// Create a new config builder
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Add a TOML file source
    pub fn add_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources
            .push(ConfigSource::File(path.as_ref().to_string_lossy().to_string()));
        self
    }

    /// Add environment variables
    pub fn add_env(mut self, prefix: impl Into<String>) -> Self {
        self.sources.push(ConfigSource::Environment(prefix.into()));
        self
    }

    /// Add TOML string
    pub fn add_toml(mut self, toml: impl Into<String>) -> Self {
        self.sources.push(ConfigSource::Toml(toml.into()));
        self
    }

    /// Use default values
    pub fn use_defaults(mut self) -> Self {
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<T> {
        load_config::<T>(self.sources)
    }
}

impl<T: for<'de> Deserialize<'de> + Debug> Default for ConfigBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Load collector settings from a TOML file, falling back to defaults
/// for every field the file leaves out
pub fn load_vitals_config<P: AsRef<Path>>(path: P) -> Result<VitalsConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VitalsError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        ))
        .into());
    }

    ConfigBuilder::<VitalsConfig>::new()
        .use_defaults()
        .add_file(path)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_from_empty_source() {
        let config = ConfigBuilder::<VitalsConfig>::new()
            .use_defaults()
            .add_toml("")
            .build()
            .unwrap();

        assert_eq!(config, VitalsConfig::default());
        assert_eq!(config.slow_resource_initiators, vec!["img", "css", "script"]);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            name = "portfolio"
            log_level = "debug"
            slow_resource_threshold_ms = 500.0
            slow_resource_initiators = ["img", "fetch"]
        "#
        )
        .unwrap();

        let config = load_vitals_config(file.path()).unwrap();
        assert_eq!(config.name, "portfolio");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.slow_resource_threshold_ms, 500.0);
        assert_eq!(config.slow_resource_initiators, vec!["img", "fetch"]);
        assert_eq!(config.buffer_size, 100);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_vitals_config("/definitely/not/here/vitals.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_multiple_sources() {
        let config = ConfigBuilder::<VitalsConfig>::new()
            .add_toml("buffer_size = 10\nweb_vitals_category = \"CWV\"")
            .add_toml("buffer_size = 20")
            .build()
            .unwrap();

        // Later sources override earlier ones
        assert_eq!(config.buffer_size, 20);
        assert_eq!(config.web_vitals_category, "CWV");
    }
}
