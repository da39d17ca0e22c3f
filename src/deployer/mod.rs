//! # Module Deployers
//!
//! Adapters translating the orchestrator-facing deploy/undeploy/status
//! contract into workflow events and cluster queries.
//!
//! `deploy` and `undeploy` only queue an event on the adapter's workflow
//! engine; the returned id does not imply the module is running yet. Callers
//! that need to observe completion use [`ModuleDeployer::flush`] or the
//! engine handle directly.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::DeployerResult;
use crate::models::{ModuleDeploymentId, ModuleDeploymentRequest, ModuleStatus};

pub mod stream;
pub mod task;

pub use stream::StreamModuleDeployer;
pub use task::TaskModuleDeployer;

#[async_trait]
pub trait ModuleDeployer: Send + Sync {
    /// Queue deployment of the requested module
    async fn deploy(&self, request: ModuleDeploymentRequest) -> DeployerResult<ModuleDeploymentId>;

    /// Queue undeployment of `id`; an id with nothing running is not an error
    async fn undeploy(&self, id: &ModuleDeploymentId) -> DeployerResult<()>;

    /// Status of every module visible on the platform
    async fn status_all(&self) -> DeployerResult<HashMap<ModuleDeploymentId, ModuleStatus>>;

    /// Status of one module, unknown with no instances when absent
    async fn status(&self, id: &ModuleDeploymentId) -> DeployerResult<ModuleStatus> {
        let mut statuses = self.status_all().await?;
        Ok(statuses
            .remove(id)
            .unwrap_or_else(|| ModuleStatus::unknown(id.clone())))
    }

    /// Wait until every queued deploy/undeploy has been processed
    async fn flush(&self) -> DeployerResult<()>;

    /// Stop the adapter's workflow engine
    async fn shutdown(&self) -> DeployerResult<()>;
}
