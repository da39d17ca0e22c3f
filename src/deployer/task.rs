//! Task-style deployer: every module invocation runs as its own application.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::ModuleDeployer;
use crate::cluster::ClusterControlFacade;
use crate::config::{DeployerConfig, TaskConfig};
use crate::constants::launch;
use crate::error::DeployerResult;
use crate::models::{CloudAppType, ModuleDeploymentId, ModuleDeploymentRequest, ModuleStatus};
use crate::state_machine::{WorkflowDefinition, WorkflowEngine, WorkflowMessage};
use crate::status::{encode_app_name, reconcile_instances};

#[derive(Debug)]
pub struct TaskModuleDeployer {
    facade: Arc<ClusterControlFacade>,
    settings: TaskConfig,
    engine: WorkflowEngine,
}

impl TaskModuleDeployer {
    /// Start the task workflow engine. Must be called within a tokio runtime.
    pub fn new(facade: Arc<ClusterControlFacade>, config: &DeployerConfig) -> Self {
        let engine = WorkflowEngine::start(
            WorkflowDefinition::task(facade.clone()),
            config.engine.event_buffer_size,
        );
        Self {
            facade,
            settings: config.task.clone(),
            engine,
        }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }
}

/// Launch arguments handed to the task application: coordinates, the
/// instance name, then one argument per definition parameter in key order
pub fn task_launch_args(app_name: &str, request: &ModuleDeploymentRequest) -> Vec<String> {
    let mut args = Vec::with_capacity(request.definition.parameters.len() + 2);
    args.push(format!("{}{}", launch::MODULE_COORDINATES_ARG, request.coordinates));
    args.push(format!("{}{app_name}", launch::APP_NAME_ARG));
    args.extend(
        request
            .definition
            .parameters
            .iter()
            .map(|(key, value)| format!("{}{key}='{value}'", launch::MODULE_PARAMETER_ARG_PREFIX)),
    );
    args
}

#[async_trait]
impl ModuleDeployer for TaskModuleDeployer {
    async fn deploy(&self, request: ModuleDeploymentRequest) -> DeployerResult<ModuleDeploymentId> {
        let id = ModuleDeploymentId::from_definition(&request.definition);
        let app_name = encode_app_name(CloudAppType::Task, &id)?;

        let message = WorkflowMessage::deploy()
            .with_app_version(&self.settings.app_version)
            .with_module(request.coordinates.to_string())
            .with_definition_parameters(request.definition.parameters.clone())
            .with_context_run_args(task_launch_args(&app_name, &request));

        info!(app_type = %CloudAppType::Task, app_name = %app_name, "Queueing task module deployment");
        self.engine.send_event(message).await?;
        Ok(id)
    }

    async fn undeploy(&self, id: &ModuleDeploymentId) -> DeployerResult<()> {
        let app_name = encode_app_name(CloudAppType::Task, id)?;
        let message = WorkflowMessage::undeploy()
            .with_app_version(&self.settings.app_version)
            .with_app_name(&app_name);

        info!(app_type = %CloudAppType::Task, app_name = %app_name, "Queueing task module undeployment");
        self.engine.send_event(message).await
    }

    async fn status_all(&self) -> DeployerResult<HashMap<ModuleDeploymentId, ModuleStatus>> {
        let instances = self.facade.get_instances(CloudAppType::Task).await?;
        Ok(reconcile_instances(CloudAppType::Task, &instances))
    }

    async fn flush(&self) -> DeployerResult<()> {
        self.engine.flush().await
    }

    async fn shutdown(&self) -> DeployerResult<()> {
        self.engine.shutdown().await
    }
}
