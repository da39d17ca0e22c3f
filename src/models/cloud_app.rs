//! Platform-facing types: application kinds, bundles, instances and partitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{naming, platform};

/// Kind of cloud application a workflow or session targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudAppType {
    /// Long-running shared application partitioned into clusters
    Stream,
    /// One application instance per invocation
    Task,
}

impl CloudAppType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Task => "task",
        }
    }

    /// Naming-convention kind prefix (`scdstream` / `scdtask`)
    pub fn name_kind(&self) -> &'static str {
        match self {
            Self::Stream => naming::STREAM_KIND,
            Self::Task => naming::TASK_KIND,
        }
    }
}

impl fmt::Display for CloudAppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CloudAppType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(Self::Stream),
            "task" => Ok(Self::Task),
            _ => Err(format!("Invalid cloud app type: {s}")),
        }
    }
}

/// A deployable bundle already present in durable storage, named by version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleInfo {
    pub name: String,
}

impl BundleInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A running application instance as reported by the cluster platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    pub application_id: String,
    pub name: String,
    pub state: String,
    pub address: String,
}

impl InstanceInfo {
    pub fn new(
        application_id: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            name: name.into(),
            state: state.into(),
            address: address.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == platform::STATE_RUNNING
    }
}

/// A named subdivision of a running stream application hosting one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPartition {
    pub cluster_id: String,
    pub definition_parameters: BTreeMap<String, String>,
    pub module_coordinates: String,
}

impl ClusterPartition {
    pub fn new(
        cluster_id: impl Into<String>,
        module_coordinates: impl Into<String>,
        definition_parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            definition_parameters,
            module_coordinates: module_coordinates.into(),
        }
    }

    /// Extra properties handed to the partition's containers.
    ///
    /// `containerModules` carries the coordinates; each parameter becomes an
    /// indexed `containerArgN` rendered as `key=\"value\"`. Values already
    /// wrapped in double quotes keep their quotes, escaped.
    pub fn extra_properties(&self) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();
        properties.insert(
            platform::CONTAINER_MODULES.to_string(),
            self.module_coordinates.clone(),
        );

        for (index, (key, value)) in self.definition_parameters.iter().enumerate() {
            let rendered = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                let inner = &value[1..value.len() - 1];
                format!("{key}=\\\"{inner}\\\"")
            } else {
                format!("{key}=\\\"{value}\\\"")
            };
            properties.insert(
                format!("{}{index}", platform::CONTAINER_ARG_PREFIX),
                rendered,
            );
        }

        properties
    }
}

/// Request body for creating a partition inside a stream application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionCreateRequest {
    pub cluster_id: String,
    pub cluster_def: String,
    pub projection: String,
    pub projection_any: u32,
    pub extra_properties: BTreeMap<String, String>,
}

/// Summary of a partition as described by the owning application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionState {
    pub cluster_id: String,
    pub state: String,
    pub members: u32,
}

impl PartitionState {
    pub fn is_running(&self) -> bool {
        self.state == platform::STATE_RUNNING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_type_naming_kind() {
        assert_eq!(CloudAppType::Stream.name_kind(), "scdstream");
        assert_eq!(CloudAppType::Task.name_kind(), "scdtask");
        assert_eq!("TASK".parse::<CloudAppType>().unwrap(), CloudAppType::Task);
        assert!("batch".parse::<CloudAppType>().is_err());
    }

    #[test]
    fn test_app_type_serde() {
        let json = serde_json::to_string(&CloudAppType::Stream).unwrap();
        assert_eq!(json, "\"STREAM\"");
    }

    #[test]
    fn test_partition_extra_properties_quoting() {
        let mut params = BTreeMap::new();
        params.insert("expression".to_string(), "\"hello\"".to_string());
        params.insert("spring.cloud.stream.bindings.output".to_string(), "ticktock.0".to_string());

        let partition = ClusterPartition::new("scdstream:ticktock:time", "g:time-source:jar:1.0", params);
        let props = partition.extra_properties();

        assert_eq!(props.get("containerModules").unwrap(), "g:time-source:jar:1.0");
        assert_eq!(props.get("containerArg0").unwrap(), "expression=\\\"hello\\\"");
        assert_eq!(
            props.get("containerArg1").unwrap(),
            "spring.cloud.stream.bindings.output=\\\"ticktock.0\\\""
        );
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn test_instance_running_check() {
        let running = InstanceInfo::new("application_1_0001", "scdtask:g:l", "RUNNING", "http://host");
        let finished = InstanceInfo::new("application_1_0002", "scdtask:g:l", "FINISHED", "http://host");
        assert!(running.is_running());
        assert!(!finished.is_running());
    }
}
