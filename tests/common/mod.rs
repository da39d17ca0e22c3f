//! Shared fixtures for the integration tests

#![allow(dead_code)] // Not every test binary uses every helper

pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use yarn_deployer::cluster::{CallPhase, ClusterControlFacade, InMemoryClusterService, RecordedCall};
use yarn_deployer::models::{ArtifactCoordinates, ModuleDefinition, ModuleDeploymentRequest};
use yarn_deployer::state_machine::{WorkflowDefinition, WorkflowEngine};
use yarn_deployer::{DeployerConfig, StreamModuleDeployer, TaskModuleDeployer};

/// Platform plus the facade wired to it
pub struct TestCluster {
    pub platform: InMemoryClusterService,
    pub facade: Arc<ClusterControlFacade>,
    pub config: DeployerConfig,
}

impl TestCluster {
    pub fn new() -> Self {
        Self::with_platform(InMemoryClusterService::new())
    }

    pub fn with_platform(platform: InMemoryClusterService) -> Self {
        let facade = Arc::new(ClusterControlFacade::new(
            Arc::new(platform.clone()),
            Some("1.0.0".to_string()),
        ));
        Self {
            platform,
            facade,
            config: DeployerConfig::default(),
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.platform.set_latency(latency);
        self
    }

    pub fn stream_engine(&self) -> WorkflowEngine {
        WorkflowEngine::start(
            WorkflowDefinition::stream(self.facade.clone(), self.config.stream.clone()),
            self.config.engine.event_buffer_size,
        )
    }

    pub fn task_engine(&self) -> WorkflowEngine {
        WorkflowEngine::start(
            WorkflowDefinition::task(self.facade.clone()),
            self.config.engine.event_buffer_size,
        )
    }

    pub fn stream_deployer(&self) -> StreamModuleDeployer {
        StreamModuleDeployer::new(self.facade.clone(), &self.config)
    }

    pub fn task_deployer(&self) -> TaskModuleDeployer {
        TaskModuleDeployer::new(self.facade.clone(), &self.config)
    }
}

pub fn module_request(group: &str, label: &str) -> ModuleDeploymentRequest {
    ModuleDeploymentRequest::new(
        ModuleDefinition::new(group, label),
        ArtifactCoordinates::new("org.example.modules", format!("{label}-module"), "1.0.0"),
    )
}

/// True when every start marker is immediately followed by its own finish
/// marker, i.e. no two remote calls overlapped
pub fn calls_are_sequential(calls: &[RecordedCall]) -> bool {
    calls.len() % 2 == 0
        && calls.chunks(2).all(|pair| {
            pair[0].phase == CallPhase::Start
                && pair[1].phase == CallPhase::Finish
                && pair[0].operation == pair[1].operation
        })
}
