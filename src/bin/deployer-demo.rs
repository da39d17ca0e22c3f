//! # Deployer Demo
//!
//! Drives both module deployers against the in-memory cluster platform:
//! deploys a stream module and a task module, prints their status, then
//! undeploys them.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use yarn_deployer::cluster::{ClusterControlFacade, InMemoryClusterService};
use yarn_deployer::deployer::{ModuleDeployer, StreamModuleDeployer, TaskModuleDeployer};
use yarn_deployer::logging::init_structured_logging;
use yarn_deployer::models::{
    ArtifactCoordinates, ModuleDefinition, ModuleDeploymentId, ModuleDeploymentRequest,
};
use yarn_deployer::DeployerConfig;

#[derive(Parser)]
#[command(name = "deployer-demo")]
#[command(about = "Deploy sample stream and task modules onto an in-memory cluster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML configuration file layered over the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated latency of every cluster call, in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Partition member count for the stream module
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Skip the undeploy phase
    #[arg(long)]
    keep: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = DeployerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_structured_logging();

    let platform = InMemoryClusterService::new();
    platform.set_latency(Duration::from_millis(cli.latency_ms));
    let facade = Arc::new(ClusterControlFacade::new(
        Arc::new(platform.clone()),
        config.dataflow_version.clone(),
    ));

    let stream = StreamModuleDeployer::new(facade.clone(), &config);
    let task = TaskModuleDeployer::new(facade, &config);

    let stream_id = stream
        .deploy(
            ModuleDeploymentRequest::new(
                ModuleDefinition::new("ticktock", "time").with_parameter("fixedDelay", "5"),
                ArtifactCoordinates::new("org.springframework.cloud.stream.module", "time-source", "1.0.0")
                    .with_classifier("exec"),
            )
            .with_property("count", cli.count.to_string()),
        )
        .await
        .context("deploying stream module")?;

    let task_id = task
        .deploy(ModuleDeploymentRequest::new(
            ModuleDefinition::new("batch", "timestamp").with_parameter("format", "yyyy-MM-dd"),
            ArtifactCoordinates::new("org.springframework.cloud.task.module", "timestamp-task", "1.0.0")
                .with_classifier("exec"),
        ))
        .await
        .context("deploying task module")?;

    stream.flush().await?;
    task.flush().await?;

    println!("📋 After deploy");
    print_status("stream", &stream, &stream_id).await?;
    print_status("task", &task, &task_id).await?;

    if !cli.keep {
        stream.undeploy(&stream_id).await?;
        task.undeploy(&task_id).await?;
        stream.flush().await?;
        task.flush().await?;

        println!("📋 After undeploy");
        print_status("stream", &stream, &stream_id).await?;
        print_status("task", &task, &task_id).await?;
    }

    info!(cluster_calls = platform.operations().len(), "Demo complete");

    stream.shutdown().await?;
    task.shutdown().await?;
    Ok(())
}

async fn print_status(
    kind: &str,
    deployer: &dyn ModuleDeployer,
    id: &ModuleDeploymentId,
) -> anyhow::Result<()> {
    let status = deployer.status(id).await?;
    println!("  {kind:<6} {:<20} {:?}", id.to_string(), status.state());
    for instance in &status.instances {
        let mut attributes: Vec<_> = instance.attributes.iter().collect();
        attributes.sort();
        println!("         running={} {:?}", instance.running, attributes);
    }
    Ok(())
}
