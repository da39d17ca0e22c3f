//! # Data Models
//!
//! Platform-facing types reported by the cluster control service and the
//! deployer-facing types exchanged with the orchestrating service.

pub mod cloud_app;
pub mod deployment;

pub use cloud_app::{
    BundleInfo, CloudAppType, ClusterPartition, InstanceInfo, PartitionCreateRequest,
    PartitionState,
};
pub use deployment::{
    ArtifactCoordinates, DeploymentState, ModuleDefinition, ModuleDeploymentId,
    ModuleDeploymentRequest, ModuleInstanceStatus, ModuleStatus,
};
