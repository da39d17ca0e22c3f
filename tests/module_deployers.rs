//! Module deployer integration tests

mod common;

use common::{module_request, TestCluster};
use yarn_deployer::cluster::shared_stream_name;
use yarn_deployer::models::{CloudAppType, InstanceInfo};
use yarn_deployer::{DeploymentState, ModuleDeployer, ModuleDeploymentId};

#[tokio::test]
async fn stream_status_reports_deployed_module_as_running() {
    let cluster = TestCluster::new();
    let deployer = cluster.stream_deployer();

    let id = deployer
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    assert_eq!(id, ModuleDeploymentId::new("ticktock", "time"));
    deployer.flush().await.unwrap();

    let statuses = deployer.status_all().await.unwrap();
    let status = statuses.get(&id).expect("module missing from status map");
    assert!(status.is_running());
    assert_eq!(status.state(), DeploymentState::Deployed);

    // the shared application is not a module
    assert_eq!(statuses.len(), 1);
    let stream_instances = cluster.platform.instances(CloudAppType::Stream);
    assert_eq!(stream_instances.len(), 1);
    assert_eq!(stream_instances[0].name, shared_stream_name("app"));
}

#[tokio::test]
async fn stream_status_maps_named_running_instance() {
    let cluster = TestCluster::new();
    cluster.platform.add_instance(
        CloudAppType::Stream,
        InstanceInfo::new(
            "application_7_0001",
            "scdstream:ticktock:time",
            "RUNNING",
            "http://node1:8080",
        ),
    );
    cluster.platform.add_instance(
        CloudAppType::Stream,
        InstanceInfo::new("application_7_0002", "scdstream:bad", "RUNNING", "http://node2:8080"),
    );
    let deployer = cluster.stream_deployer();

    let statuses = deployer.status_all().await.unwrap();
    assert_eq!(statuses.len(), 1);

    let status = &statuses[&ModuleDeploymentId::new("ticktock", "time")];
    assert!(status.is_running());
    let attributes = &status.instances[0].attributes;
    assert_eq!(attributes["applicationId"], "application_7_0001");
    assert_eq!(attributes["address"], "http://node1:8080");
    assert_eq!(attributes["state"], "RUNNING");
}

#[tokio::test]
async fn stream_partition_carries_module_and_count() {
    let cluster = TestCluster::new();
    let deployer = cluster.stream_deployer();

    let mut request = module_request("ticktock", "time").with_property("count", "3");
    request.definition = request
        .definition
        .with_parameter("fixedDelay", "5")
        .with_parameter("format", "\"HH:mm\"");
    request.coordinates = request.coordinates.with_classifier("exec");

    deployer.deploy(request).await.unwrap();
    deployer.flush().await.unwrap();

    let (create, state) = cluster
        .platform
        .partition("application_1_0001", "scdstream:ticktock:time")
        .expect("partition was not created");
    assert_eq!(state, "RUNNING");
    assert_eq!(create.cluster_def, "module-template");
    assert_eq!(create.projection, "default");
    assert_eq!(create.projection_any, 3);
    assert_eq!(
        create.extra_properties["containerModules"],
        "org.example.modules:time-module:jar:exec:1.0.0"
    );
    assert_eq!(create.extra_properties["containerArg0"], "fixedDelay=\\\"5\\\"");
    assert_eq!(create.extra_properties["containerArg1"], "format=\\\"HH:mm\\\"");
}

#[tokio::test]
async fn stream_undeploy_stops_partition() {
    let cluster = TestCluster::new();
    let deployer = cluster.stream_deployer();

    let id = deployer
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    deployer.undeploy(&id).await.unwrap();
    deployer.flush().await.unwrap();

    let status = deployer.status(&id).await.unwrap();
    assert!(!status.is_running());
    assert_eq!(status.state(), DeploymentState::Undeployed);
    assert_eq!(cluster.platform.call_count("stop_cluster"), 1);
}

#[tokio::test]
async fn stream_module_can_be_redeployed_after_undeploy() {
    let cluster = TestCluster::new();
    let deployer = cluster.stream_deployer();

    let id = deployer
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    deployer.undeploy(&id).await.unwrap();
    deployer.flush().await.unwrap();
    assert!(!deployer.status(&id).await.unwrap().is_running());

    deployer
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    deployer.flush().await.unwrap();

    assert!(deployer.status(&id).await.unwrap().is_running());
    // the stopped partition is restarted, not created twice
    assert_eq!(cluster.platform.call_count("create_cluster"), 1);
    assert_eq!(cluster.platform.call_count("start_cluster"), 2);
    let (_, state) = cluster
        .platform
        .partition("application_1_0001", "scdstream:ticktock:time")
        .expect("partition is gone");
    assert_eq!(state, "RUNNING");
}

#[tokio::test]
async fn stream_redeploy_recovers_after_failed_start() {
    let cluster = TestCluster::new();
    cluster
        .platform
        .fail_partition_op("start", "container launch failed");
    let deployer = cluster.stream_deployer();

    let id = deployer
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    deployer.flush().await.unwrap();
    assert!(!deployer.status(&id).await.unwrap().is_running());
    let (_, state) = cluster
        .platform
        .partition("application_1_0001", "scdstream:ticktock:time")
        .expect("partition was not created");
    assert_eq!(state, "INITIAL");

    cluster.platform.clear_failures();
    deployer
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    deployer.flush().await.unwrap();

    assert!(deployer.status(&id).await.unwrap().is_running());
    assert_eq!(cluster.platform.call_count("create_cluster"), 1);
}

#[tokio::test]
async fn undeploy_of_unknown_module_leaves_status_unchanged() {
    let cluster = TestCluster::new();
    let stream = cluster.stream_deployer();
    let task = cluster.task_deployer();

    stream
        .deploy(module_request("ticktock", "time"))
        .await
        .unwrap();
    task.deploy(module_request("batch", "ts")).await.unwrap();
    stream.flush().await.unwrap();
    task.flush().await.unwrap();

    let stream_before = stream.status_all().await.unwrap();
    let task_before = task.status_all().await.unwrap();

    let unknown = ModuleDeploymentId::new("nothing", "here");
    stream.undeploy(&unknown).await.unwrap();
    task.undeploy(&unknown).await.unwrap();
    stream.flush().await.unwrap();
    task.flush().await.unwrap();

    assert_eq!(stream.status_all().await.unwrap(), stream_before);
    assert_eq!(task.status_all().await.unwrap(), task_before);
    assert_eq!(cluster.platform.call_count("stop_cluster"), 0);
    assert_eq!(cluster.platform.call_count("kill_application"), 0);

    let status = task.status(&unknown).await.unwrap();
    assert_eq!(status.state(), DeploymentState::Unknown);
    assert!(status.instances.is_empty());
}

#[tokio::test]
async fn task_deploy_launches_named_instance() {
    let cluster = TestCluster::new();
    let deployer = cluster.task_deployer();

    let mut request = module_request("batch", "ts");
    request.definition = request.definition.with_parameter("format", "yyyy");
    let id = deployer.deploy(request).await.unwrap();
    deployer.flush().await.unwrap();

    let instances = cluster.platform.instances(CloudAppType::Task);
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].name, "scdtask:batch:ts");

    let submit_bootstrap = cluster
        .platform
        .bootstraps()
        .into_iter()
        .find(|bootstrap| bootstrap.launch_args.len() > 1)
        .expect("no bootstrap with launch arguments");
    assert_eq!(
        submit_bootstrap.launch_args,
        vec![
            "--spring.config.name=task".to_string(),
            "--spring.yarn.client.launchcontext.arguments.--dataflow.module.coordinates=org.example.modules:ts-module:jar:1.0.0".to_string(),
            "--spring.yarn.appName=scdtask:batch:ts".to_string(),
            "--spring.yarn.client.launchcontext.arguments.--dataflow.module.parameters.format='yyyy'".to_string(),
        ]
    );
    assert_eq!(submit_bootstrap.dataflow_version.as_deref(), Some("1.0.0"));

    assert!(deployer.status(&id).await.unwrap().is_running());

    deployer.undeploy(&id).await.unwrap();
    deployer.flush().await.unwrap();
    let status = deployer.status(&id).await.unwrap();
    assert_eq!(status.state(), DeploymentState::Undeployed);
    assert_eq!(status.instances[0].attributes["state"], "KILLED");
}

#[tokio::test]
async fn delimiter_in_module_name_is_rejected() {
    let cluster = TestCluster::new();
    let deployer = cluster.task_deployer();

    let err = deployer
        .deploy(module_request("batch:nightly", "ts"))
        .await
        .unwrap_err();
    assert!(matches!(err, yarn_deployer::DeployerError::InvalidNameError(_)));
}
