//! Stream-style deployer: every module runs as a partition of one shared,
//! long-running stream application.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::ModuleDeployer;
use crate::cluster::{shared_stream_name, ClusterControlFacade};
use crate::config::{DeployerConfig, StreamConfig};
use crate::error::{DeployerError, DeployerResult};
use crate::models::{
    CloudAppType, ModuleDeploymentId, ModuleDeploymentRequest, ModuleStatus,
};
use crate::state_machine::{WorkflowDefinition, WorkflowEngine, WorkflowMessage};
use crate::status::{encode_app_name, merge_partition_states, reconcile_instances};

/// Deployment property overriding the partition member count
pub const COUNT_PROPERTY: &str = "count";

#[derive(Debug)]
pub struct StreamModuleDeployer {
    facade: Arc<ClusterControlFacade>,
    settings: StreamConfig,
    engine: WorkflowEngine,
}

impl StreamModuleDeployer {
    /// Start the stream workflow engine. Must be called within a tokio runtime.
    pub fn new(facade: Arc<ClusterControlFacade>, config: &DeployerConfig) -> Self {
        let engine = WorkflowEngine::start(
            WorkflowDefinition::stream(facade.clone(), config.stream.clone()),
            config.engine.event_buffer_size,
        );
        Self {
            facade,
            settings: config.stream.clone(),
            engine,
        }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    fn partition_count(&self, request: &ModuleDeploymentRequest) -> DeployerResult<u32> {
        let Some(raw) = request.deployment_properties.get(COUNT_PROPERTY) else {
            return Ok(self.settings.default_count);
        };

        match raw.trim().parse::<u32>() {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(DeployerError::configuration(format!(
                "deployment property '{COUNT_PROPERTY}' must be a positive integer, got '{raw}'"
            ))),
        }
    }
}

#[async_trait]
impl ModuleDeployer for StreamModuleDeployer {
    async fn deploy(&self, request: ModuleDeploymentRequest) -> DeployerResult<ModuleDeploymentId> {
        let id = ModuleDeploymentId::from_definition(&request.definition);
        let cluster_id = encode_app_name(CloudAppType::Stream, &id)?;
        let count = self.partition_count(&request)?;

        let message = WorkflowMessage::deploy()
            .with_app_version(&self.settings.app_version)
            .with_cluster_id(&cluster_id)
            .with_module(request.coordinates.to_string())
            .with_definition_parameters(request.definition.parameters.clone())
            .with_count(count);

        info!(
            app_type = %CloudAppType::Stream,
            cluster_id = %cluster_id,
            count = count,
            "Queueing stream module deployment"
        );
        self.engine.send_event(message).await?;
        Ok(id)
    }

    async fn undeploy(&self, id: &ModuleDeploymentId) -> DeployerResult<()> {
        let cluster_id = encode_app_name(CloudAppType::Stream, id)?;
        let message = WorkflowMessage::undeploy()
            .with_app_version(&self.settings.app_version)
            .with_cluster_id(&cluster_id);

        info!(app_type = %CloudAppType::Stream, cluster_id = %cluster_id, "Queueing stream module undeployment");
        self.engine.send_event(message).await
    }

    async fn status_all(&self) -> DeployerResult<HashMap<ModuleDeploymentId, ModuleStatus>> {
        let shared_name = shared_stream_name(&self.settings.app_version);
        let instances = self.facade.get_instances(CloudAppType::Stream).await?;
        let mut statuses = reconcile_instances(
            CloudAppType::Stream,
            instances.iter().filter(|instance| instance.name != shared_name),
        );

        let partitions = self
            .facade
            .cluster_partition_states(&self.settings.app_version)
            .await?;
        merge_partition_states(&mut statuses, &partitions);

        Ok(statuses)
    }

    async fn flush(&self) -> DeployerResult<()> {
        self.engine.flush().await
    }

    async fn shutdown(&self) -> DeployerResult<()> {
        self.engine.shutdown().await
    }
}
