//! # Deployer Configuration
//!
//! Layered in order: built-in defaults, an optional TOML file, then
//! environment variables such as `DEPLOYER__STREAM__APP_VERSION=app2` or
//! `DEPLOYER__ENGINE__EVENT_BUFFER_SIZE=128`.

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::constants::{DEFAULT_APP_VERSION, DEFAULT_CLUSTER_TEMPLATE, DEFAULT_PROJECTION};
use crate::error::{DeployerError, DeployerResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    /// Dataflow version propagated into every session bootstrap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataflow_version: Option<String>,
    pub stream: StreamConfig,
    pub task: TaskConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub app_version: String,
    /// Cluster template used for every module partition
    pub cluster_template: String,
    pub projection: String,
    /// Partition member count when a request does not carry one
    pub default_count: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            app_version: DEFAULT_APP_VERSION.to_string(),
            cluster_template: DEFAULT_CLUSTER_TEMPLATE.to_string(),
            projection: DEFAULT_PROJECTION.to_string(),
            default_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub app_version: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each workflow engine's event queue
    pub event_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 64,
        }
    }
}

impl DeployerConfig {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> DeployerResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading deployer configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("DEPLOYER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DeployerResult<()> {
        if self.stream.app_version.trim().is_empty() {
            return Err(DeployerError::configuration("stream.app_version must not be empty"));
        }
        if self.task.app_version.trim().is_empty() {
            return Err(DeployerError::configuration("task.app_version must not be empty"));
        }
        if self.stream.cluster_template.trim().is_empty() {
            return Err(DeployerError::configuration(
                "stream.cluster_template must not be empty",
            ));
        }
        if self.stream.projection.trim().is_empty() {
            return Err(DeployerError::configuration("stream.projection must not be empty"));
        }
        if self.stream.default_count == 0 {
            return Err(DeployerError::configuration(
                "stream.default_count must be greater than 0",
            ));
        }
        if self.engine.event_buffer_size == 0 {
            return Err(DeployerError::configuration(
                "engine.event_buffer_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeployerConfig::default();
        assert_eq!(config.stream.app_version, "app");
        assert_eq!(config.stream.cluster_template, "module-template");
        assert_eq!(config.stream.projection, "default");
        assert_eq!(config.stream.default_count, 1);
        assert_eq!(config.engine.event_buffer_size, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_count() {
        let mut config = DeployerConfig::default();
        config.stream.default_count = 0;
        assert!(matches!(
            config.validate(),
            Err(DeployerError::ConfigurationError(_))
        ));
    }
}
