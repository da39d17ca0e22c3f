//! Boundary traits for the external cluster control service.

use async_trait::async_trait;
use std::sync::Arc;

use super::session::SessionBootstrap;
use crate::error::DeployerResult;
use crate::models::{BundleInfo, InstanceInfo, PartitionCreateRequest, PartitionState};

/// A live session against the cluster platform, bound to one app type,
/// version and set of launch arguments.
#[async_trait]
pub trait ClusterSession: Send + Sync {
    /// Bundles already pushed to durable storage
    async fn list_bundles(&self) -> DeployerResult<Vec<BundleInfo>>;

    /// Application instances known to the resource manager
    async fn list_instances(&self) -> DeployerResult<Vec<InstanceInfo>>;

    async fn push_bundle(&self, version: &str) -> DeployerResult<()>;

    /// Launch an application from the session's bundle, returning its id
    async fn submit_application(&self) -> DeployerResult<String>;

    async fn kill_application(&self, application_id: &str) -> DeployerResult<()>;

    async fn create_cluster(
        &self,
        application_id: &str,
        request: &PartitionCreateRequest,
    ) -> DeployerResult<()>;

    async fn start_cluster(&self, application_id: &str, cluster_id: &str) -> DeployerResult<()>;

    async fn stop_cluster(&self, application_id: &str, cluster_id: &str) -> DeployerResult<()>;

    async fn destroy_cluster(&self, application_id: &str, cluster_id: &str) -> DeployerResult<()>;

    async fn list_clusters(&self, application_id: &str) -> DeployerResult<Vec<String>>;

    /// `None` when the application does not know the partition
    async fn cluster_info(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> DeployerResult<Option<PartitionState>>;
}

/// Builds sessions for the session cache
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(
        &self,
        bootstrap: &SessionBootstrap,
    ) -> DeployerResult<Arc<dyn ClusterSession>>;
}
