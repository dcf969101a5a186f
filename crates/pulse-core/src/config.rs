//! Publisher/observer settings and the `pulse.toml` parser.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_ENDPOINT;
use crate::error::{ConfigError, ConfigResult};
use crate::strategy::ThresholdTable;

/// Settings for a `LoadPublisher`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    /// Route for out-of-band load queries.
    pub endpoint: String,
    /// Used to classify the load reported on the pulse route.
    pub thresholds: ThresholdTable,
    /// Seed for the default static load source.
    pub initial_load: f64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            thresholds: ThresholdTable::default(),
            initial_load: 0.0,
        }
    }
}

impl PublisherConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_literal_path(&self.endpoint) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if !(0.0..=1.0).contains(&self.initial_load) {
            return Err(ConfigError::InitialLoad(self.initial_load));
        }
        Ok(())
    }
}

/// An absolute route path with no capture or wildcard syntax.
fn is_literal_path(endpoint: &str) -> bool {
    endpoint.starts_with('/') && !endpoint.contains(['{', '}', '*'])
}

/// Settings for a `PulseObserver`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverConfig {
    #[serde(default)]
    pub thresholds: ThresholdTable,
}

/// The `[publisher]` section of `pulse.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub initial_load: f64,
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            initial_load: 0.0,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Top-level `pulse.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub publisher: PublisherSection,
    #[serde(default)]
    pub thresholds: ThresholdTable,
}

impl PulseConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: PulseConfig = toml::from_str(content)?;
        config.publisher_config().validate()?;
        Ok(config)
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            endpoint: self.publisher.endpoint.clone(),
            thresholds: self.thresholds,
            initial_load: self.publisher.initial_load,
        }
    }

    pub fn observer_config(&self) -> ObserverConfig {
        ObserverConfig {
            thresholds: self.thresholds,
        }
    }
}
