//! Deployer-facing types: module identities, requests and status snapshots.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Identity of one deployed module instance, unique per (group, label)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleDeploymentId {
    pub group: String,
    pub label: String,
}

impl ModuleDeploymentId {
    pub fn new(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            label: label.into(),
        }
    }

    pub fn from_definition(definition: &ModuleDefinition) -> Self {
        Self::new(definition.group.clone(), definition.label.clone())
    }
}

impl fmt::Display for ModuleDeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.label)
    }
}

/// A module as it appears in a stream or task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub group: String,
    pub label: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl ModuleDefinition {
    pub fn new(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            label: label.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Maven-style coordinates of the artifact implementing a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: Option<String>,
    pub version: String,
}

impl ArtifactCoordinates {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: "jar".to_string(),
            classifier: None,
            version: version.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.version)
    }
}

/// Request handed to a module deployer by the orchestrating service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDeploymentRequest {
    pub definition: ModuleDefinition,
    pub coordinates: ArtifactCoordinates,
    #[serde(default)]
    pub deployment_properties: HashMap<String, String>,
}

impl ModuleDeploymentRequest {
    pub fn new(definition: ModuleDefinition, coordinates: ArtifactCoordinates) -> Self {
        Self {
            definition,
            coordinates,
            deployment_properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.deployment_properties.insert(key.into(), value.into());
        self
    }
}

/// Aggregate deployment state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// At least one instance is running
    Deployed,
    /// Instances are known but none is running
    Undeployed,
    /// Nothing is known about the module
    Unknown,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployed => write!(f, "deployed"),
            Self::Undeployed => write!(f, "undeployed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Status of a single instance backing a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInstanceStatus {
    pub id: String,
    pub running: bool,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ModuleInstanceStatus {
    pub fn new(id: impl Into<String>, running: bool) -> Self {
        Self {
            id: id.into(),
            running,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Status snapshot of one deployed module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub deployment_id: ModuleDeploymentId,
    pub instances: Vec<ModuleInstanceStatus>,
}

impl ModuleStatus {
    pub fn new(deployment_id: ModuleDeploymentId) -> Self {
        Self {
            deployment_id,
            instances: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: ModuleInstanceStatus) -> Self {
        self.instances.push(instance);
        self
    }

    /// Status reported for a module the platform knows nothing about
    pub fn unknown(deployment_id: ModuleDeploymentId) -> Self {
        Self::new(deployment_id)
    }

    pub fn is_running(&self) -> bool {
        self.instances.iter().any(|instance| instance.running)
    }

    pub fn state(&self) -> DeploymentState {
        if self.instances.is_empty() {
            DeploymentState::Unknown
        } else if self.is_running() {
            DeploymentState::Deployed
        } else {
            DeploymentState::Undeployed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_display() {
        let coords = ArtifactCoordinates::new(
            "org.springframework.cloud.stream.module",
            "time-source",
            "1.0.0.BUILD-SNAPSHOT",
        )
        .with_classifier("exec");
        assert_eq!(
            coords.to_string(),
            "org.springframework.cloud.stream.module:time-source:jar:exec:1.0.0.BUILD-SNAPSHOT"
        );

        let plain = ArtifactCoordinates::new("g", "a", "1.0");
        assert_eq!(plain.to_string(), "g:a:jar:1.0");
    }

    #[test]
    fn test_unknown_status_has_no_metadata() {
        let status = ModuleStatus::unknown(ModuleDeploymentId::new("ticktock", "time"));
        assert!(status.instances.is_empty());
        assert!(!status.is_running());
        assert_eq!(status.state(), DeploymentState::Unknown);
    }

    #[test]
    fn test_status_aggregation() {
        let id = ModuleDeploymentId::new("g", "l");
        let stopped = ModuleInstanceStatus::new("g.l", false).with_attribute("state", "FINISHED");
        let running = ModuleInstanceStatus::new("g.l", true).with_attribute("state", "RUNNING");

        let undeployed = ModuleStatus::new(id.clone()).with_instance(stopped.clone());
        assert_eq!(undeployed.state(), DeploymentState::Undeployed);

        let deployed = ModuleStatus::new(id).with_instance(stopped).with_instance(running);
        assert_eq!(deployed.state(), DeploymentState::Deployed);
    }
}
