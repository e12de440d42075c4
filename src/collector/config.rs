use crate::config::VitalsConfig;

/// Configuration for a collector
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Name of the collector
    pub name: String,
    /// Buffer size for the metrics channel
    pub buffer_size: usize,
    /// Resources slower than this many milliseconds are flagged
    pub slow_resource_threshold_ms: f64,
    /// Initiator types watched for slow loads
    pub slow_resource_initiators: Vec<String>,
    /// Category attached to LCP, FID and CLS events
    pub web_vitals_category: String,
    /// Category attached to page load events
    pub performance_category: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            name: "web_vitals".to_string(),
            buffer_size: 100,
            slow_resource_threshold_ms: 1000.0,
            slow_resource_initiators: vec!["img".to_string(), "css".to_string(), "script".to_string()],
            web_vitals_category: "Web Vitals".to_string(),
            performance_category: "Performance".to_string(),
        }
    }
}

impl CollectorConfig {
    /// Whether a resource fetched by `initiator_type` is watched
    pub fn watches_initiator(&self, initiator_type: &str) -> bool {
        self.slow_resource_initiators
            .iter()
            .any(|watched| watched == initiator_type)
    }
}

impl From<&VitalsConfig> for CollectorConfig {
    fn from(config: &VitalsConfig) -> Self {
        Self {
            name: config.name.clone(),
            buffer_size: config.buffer_size,
            slow_resource_threshold_ms: config.slow_resource_threshold_ms,
            slow_resource_initiators: config.slow_resource_initiators.clone(),
            web_vitals_category: config.web_vitals_category.clone(),
            performance_category: config.performance_category.clone(),
        }
    }
}

/// Builder for collector configuration
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// Create a new collector config builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: CollectorConfig {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Set the buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set the slow resource threshold
    pub fn slow_resource_threshold_ms(mut self, threshold: f64) -> Self {
        self.config.slow_resource_threshold_ms = threshold;
        self
    }

    /// Replace the watched initiator types
    pub fn slow_resource_initiators<I, S>(mut self, initiators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.slow_resource_initiators = initiators.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration
    pub fn build(self) -> CollectorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_watched_initiators() {
        let config = CollectorConfig::default();
        assert!(config.watches_initiator("img"));
        assert!(config.watches_initiator("css"));
        assert!(config.watches_initiator("script"));
        assert!(!config.watches_initiator("fetch"));
        assert_eq!(config.slow_resource_threshold_ms, 1000.0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CollectorConfigBuilder::new("custom")
            .buffer_size(8)
            .slow_resource_threshold_ms(250.0)
            .slow_resource_initiators(["fetch"])
            .build();

        assert_eq!(config.name, "custom");
        assert_eq!(config.buffer_size, 8);
        assert!(config.watches_initiator("fetch"));
        assert!(!config.watches_initiator("img"));
        assert_eq!(config.web_vitals_category, "Web Vitals");
    }
}
