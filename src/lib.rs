#![allow(clippy::doc_markdown)] // Allow technical terms like YARN, TOML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # YARN Module Deployer
//!
//! State-machine driven deployment of stream and task modules onto a
//! YARN-style cluster resource manager.
//!
//! ## Overview
//!
//! An orchestrating service hands module deployment requests to one of two
//! deployers. Each deployer owns a workflow engine that checks whether the
//! application bundle is present on the cluster, pushes it when missing, and
//! then either launches a task application or creates and starts a partition
//! inside the shared stream application. Status queries go straight to the
//! cluster and are reconciled back into module deployment ids through the
//! `<kind>:<group>:<label>` naming convention.
//!
//! ## Module Organization
//!
//! - [`cluster`] - Cluster control facade, session cache and in-memory platform
//! - [`state_machine`] - Deployment workflow states, actions and engine
//! - [`deployer`] - Stream and task module deployers
//! - [`status`] - Naming convention and status reconciliation
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use yarn_deployer::cluster::{ClusterControlFacade, InMemoryClusterService};
//! use yarn_deployer::deployer::{ModuleDeployer, TaskModuleDeployer};
//! use yarn_deployer::models::{ArtifactCoordinates, ModuleDefinition, ModuleDeploymentRequest};
//! use yarn_deployer::DeployerConfig;
//!
//! # async fn example() -> yarn_deployer::DeployerResult<()> {
//! let config = DeployerConfig::load(None)?;
//! let platform = InMemoryClusterService::new();
//! let facade = Arc::new(ClusterControlFacade::new(
//!     Arc::new(platform),
//!     config.dataflow_version.clone(),
//! ));
//!
//! let deployer = TaskModuleDeployer::new(facade, &config);
//! let id = deployer
//!     .deploy(ModuleDeploymentRequest::new(
//!         ModuleDefinition::new("batch", "timestamp"),
//!         ArtifactCoordinates::new("org.example", "timestamp-task", "1.0.0"),
//!     ))
//!     .await?;
//!
//! deployer.flush().await?;
//! println!("{id}: {:?}", deployer.status(&id).await?.state());
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod deployer;
pub mod error;
pub mod logging;
pub mod models;
pub mod state_machine;
pub mod status;

pub use cluster::{ClusterControlFacade, InMemoryClusterService};
pub use config::{DeployerConfig, EngineConfig, StreamConfig, TaskConfig};
pub use deployer::{ModuleDeployer, StreamModuleDeployer, TaskModuleDeployer};
pub use error::{DeployerError, DeployerResult};
pub use models::{
    ArtifactCoordinates, CloudAppType, DeploymentState, ModuleDefinition, ModuleDeploymentId,
    ModuleDeploymentRequest, ModuleStatus,
};
pub use state_machine::{CycleReport, DeployEvent, DeployState, WorkflowEngine, WorkflowMessage};
