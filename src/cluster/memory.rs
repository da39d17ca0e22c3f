//! In-memory cluster control service.
//!
//! Holds bundles, application instances and partitions in process memory and
//! records a start and a finish marker for every remote call, which makes call
//! ordering observable. Failures and call latency can be injected.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::service::{ClusterSession, SessionFactory};
use super::session::SessionBootstrap;
use crate::constants::{launch, naming, platform};
use crate::error::{DeployerError, DeployerResult};
use crate::models::{BundleInfo, CloudAppType, InstanceInfo, PartitionCreateRequest, PartitionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Start,
    Finish,
}

/// One marker in the recorded call trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: String,
    pub app_type: CloudAppType,
    pub phase: CallPhase,
    pub detail: String,
}

#[derive(Debug, Clone)]
struct PartitionRecord {
    request: PartitionCreateRequest,
    state: String,
}

#[derive(Debug, Default)]
struct FailurePlan {
    session_init: Option<String>,
    submit: Option<String>,
    push: Option<String>,
    partition_ops: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct PlatformState {
    bundles: HashMap<CloudAppType, BTreeSet<String>>,
    instances: Vec<(CloudAppType, InstanceInfo)>,
    partitions: HashMap<String, BTreeMap<String, PartitionRecord>>,
    calls: Vec<RecordedCall>,
    bootstraps: Vec<SessionBootstrap>,
    next_application: u32,
    failures: FailurePlan,
    latency: Option<Duration>,
}

/// Shared handle to an in-memory cluster platform
#[derive(Debug, Clone, Default)]
pub struct InMemoryClusterService {
    state: Arc<Mutex<PlatformState>>,
}

impl InMemoryClusterService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a bundle as already present in storage
    pub fn with_bundle(self, app_type: CloudAppType, version: impl Into<String>) -> Self {
        self.state
            .lock()
            .bundles
            .entry(app_type)
            .or_default()
            .insert(version.into());
        self
    }

    pub fn add_instance(&self, app_type: CloudAppType, instance: InstanceInfo) {
        self.state.lock().instances.push((app_type, instance));
    }

    /// Delay applied inside every recorded call
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    pub fn fail_session_init(&self, reason: impl Into<String>) {
        self.state.lock().failures.session_init = Some(reason.into());
    }

    pub fn fail_submissions(&self, reason: impl Into<String>) {
        self.state.lock().failures.submit = Some(reason.into());
    }

    pub fn fail_pushes(&self, reason: impl Into<String>) {
        self.state.lock().failures.push = Some(reason.into());
    }

    /// Fail a partition operation (`create`, `start`, `stop`, `destroy`)
    pub fn fail_partition_op(&self, operation: impl Into<String>, reason: impl Into<String>) {
        self.state
            .lock()
            .failures
            .partition_ops
            .insert(operation.into(), reason.into());
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures = FailurePlan::default();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Number of started calls for `operation`
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation && call.phase == CallPhase::Start)
            .count()
    }

    /// Started operations in order
    pub fn operations(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.phase == CallPhase::Start)
            .map(|call| call.operation.clone())
            .collect()
    }

    pub fn sessions_created(&self) -> usize {
        self.state.lock().bootstraps.len()
    }

    pub fn bootstraps(&self) -> Vec<SessionBootstrap> {
        self.state.lock().bootstraps.clone()
    }

    pub fn instances(&self, app_type: CloudAppType) -> Vec<InstanceInfo> {
        self.state
            .lock()
            .instances
            .iter()
            .filter(|(kind, _)| *kind == app_type)
            .map(|(_, instance)| instance.clone())
            .collect()
    }

    /// Creation request and current state of a partition
    pub fn partition(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> Option<(PartitionCreateRequest, String)> {
        self.state
            .lock()
            .partitions
            .get(application_id)
            .and_then(|clusters| clusters.get(cluster_id))
            .map(|record| (record.request.clone(), record.state.clone()))
    }

    fn record(&self, operation: &str, app_type: CloudAppType, phase: CallPhase, detail: &str) {
        self.state.lock().calls.push(RecordedCall {
            operation: operation.to_string(),
            app_type,
            phase,
            detail: detail.to_string(),
        });
    }

    async fn call<T>(
        &self,
        operation: &str,
        app_type: CloudAppType,
        detail: &str,
        apply: impl FnOnce(&mut PlatformState) -> DeployerResult<T>,
    ) -> DeployerResult<T> {
        self.record(operation, app_type, CallPhase::Start, detail);

        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let result = {
            let mut state = self.state.lock();
            apply(&mut *state)
        };
        self.record(operation, app_type, CallPhase::Finish, detail);
        result
    }
}

#[async_trait]
impl SessionFactory for InMemoryClusterService {
    async fn create_session(
        &self,
        bootstrap: &SessionBootstrap,
    ) -> DeployerResult<Arc<dyn ClusterSession>> {
        let detail = bootstrap.launch_args.join(" ");
        self.call("create_session", bootstrap.app_type, &detail, |state| {
            if let Some(reason) = &state.failures.session_init {
                return Err(DeployerError::cluster_service(reason.clone()));
            }
            state.bootstraps.push(bootstrap.clone());
            Ok(())
        })
        .await?;

        Ok(Arc::new(InMemorySession {
            platform: self.clone(),
            bootstrap: bootstrap.clone(),
        }))
    }
}

/// Session handed out by [`InMemoryClusterService`]
#[derive(Debug)]
pub struct InMemorySession {
    platform: InMemoryClusterService,
    bootstrap: SessionBootstrap,
}

impl InMemorySession {
    fn app_type(&self) -> CloudAppType {
        self.bootstrap.app_type
    }

    /// Instance name taken from `--spring.yarn.appName=`, else `<kind>:<version>`
    fn instance_name(&self, version: &str) -> String {
        self.bootstrap
            .launch_arg(launch::APP_NAME_ARG)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!("{}{}{}", self.app_type().name_kind(), naming::DELIMITER, version)
            })
    }
}

fn partition_op<'a>(
    state: &'a mut PlatformState,
    operation: &str,
    application_id: &str,
    cluster_id: &str,
) -> DeployerResult<&'a mut BTreeMap<String, PartitionRecord>> {
    if let Some(reason) = state.failures.partition_ops.get(operation) {
        return Err(DeployerError::partition_op(
            operation,
            application_id,
            cluster_id,
            reason.clone(),
        ));
    }

    let running = state
        .instances
        .iter()
        .any(|(_, instance)| instance.application_id == application_id && instance.is_running());
    if !running {
        return Err(DeployerError::partition_op(
            operation,
            application_id,
            cluster_id,
            "application is not running",
        ));
    }

    Ok(state.partitions.entry(application_id.to_string()).or_default())
}

fn set_partition_state(
    state: &mut PlatformState,
    operation: &str,
    application_id: &str,
    cluster_id: &str,
    new_state: &str,
) -> DeployerResult<()> {
    let clusters = partition_op(state, operation, application_id, cluster_id)?;
    let record = clusters.get_mut(cluster_id).ok_or_else(|| {
        DeployerError::partition_op(operation, application_id, cluster_id, "no such cluster")
    })?;
    record.state = new_state.to_string();
    Ok(())
}

#[async_trait]
impl ClusterSession for InMemorySession {
    async fn list_bundles(&self) -> DeployerResult<Vec<BundleInfo>> {
        let app_type = self.app_type();
        self.platform
            .call("list_bundles", app_type, "", |state| {
                Ok(state
                    .bundles
                    .get(&app_type)
                    .map(|versions| versions.iter().map(BundleInfo::new).collect())
                    .unwrap_or_default())
            })
            .await
    }

    async fn list_instances(&self) -> DeployerResult<Vec<InstanceInfo>> {
        let app_type = self.app_type();
        self.platform
            .call("list_instances", app_type, "", |state| {
                Ok(state
                    .instances
                    .iter()
                    .filter(|(kind, _)| *kind == app_type)
                    .map(|(_, instance)| instance.clone())
                    .collect())
            })
            .await
    }

    async fn push_bundle(&self, version: &str) -> DeployerResult<()> {
        let app_type = self.app_type();
        self.platform
            .call("push_bundle", app_type, version, |state| {
                if let Some(reason) = &state.failures.push {
                    return Err(DeployerError::cluster_service(reason.clone()));
                }
                state
                    .bundles
                    .entry(app_type)
                    .or_default()
                    .insert(version.to_string());
                Ok(())
            })
            .await
    }

    async fn submit_application(&self) -> DeployerResult<String> {
        let app_type = self.app_type();
        let version = self
            .bootstrap
            .app_version
            .clone()
            .ok_or_else(|| DeployerError::submission("session has no application version"))?;
        let name = self.instance_name(&version);

        self.platform
            .call("submit_application", app_type, &name, |state| {
                if let Some(reason) = &state.failures.submit {
                    return Err(DeployerError::submission(reason.clone()));
                }
                let pushed = state
                    .bundles
                    .get(&app_type)
                    .is_some_and(|versions| versions.contains(&version));
                if !pushed {
                    return Err(DeployerError::submission(format!(
                        "bundle {version} has not been pushed for {app_type}"
                    )));
                }

                state.next_application += 1;
                let sequence = state.next_application;
                let application_id = format!("application_1_{sequence:04}");
                state.instances.push((
                    app_type,
                    InstanceInfo::new(
                        application_id.clone(),
                        name.clone(),
                        platform::STATE_RUNNING,
                        format!("http://localhost:{}", 8080 + sequence),
                    ),
                ));
                Ok(application_id)
            })
            .await
    }

    async fn kill_application(&self, application_id: &str) -> DeployerResult<()> {
        self.platform
            .call("kill_application", self.app_type(), application_id, |state| {
                let instance = state
                    .instances
                    .iter_mut()
                    .find(|(_, instance)| instance.application_id == application_id)
                    .ok_or_else(|| {
                        DeployerError::cluster_service(format!(
                            "unknown application {application_id}"
                        ))
                    })?;
                instance.1.state = platform::STATE_KILLED.to_string();
                Ok(())
            })
            .await
    }

    async fn create_cluster(
        &self,
        application_id: &str,
        request: &PartitionCreateRequest,
    ) -> DeployerResult<()> {
        self.platform
            .call("create_cluster", self.app_type(), &request.cluster_id, |state| {
                let clusters = partition_op(state, "create", application_id, &request.cluster_id)?;
                if clusters.contains_key(&request.cluster_id) {
                    return Err(DeployerError::partition_op(
                        "create",
                        application_id,
                        &request.cluster_id,
                        "cluster already exists",
                    ));
                }
                clusters.insert(
                    request.cluster_id.clone(),
                    PartitionRecord {
                        request: request.clone(),
                        state: platform::STATE_INITIAL.to_string(),
                    },
                );
                Ok(())
            })
            .await
    }

    async fn start_cluster(&self, application_id: &str, cluster_id: &str) -> DeployerResult<()> {
        self.platform
            .call("start_cluster", self.app_type(), cluster_id, |state| {
                set_partition_state(state, "start", application_id, cluster_id, platform::STATE_RUNNING)
            })
            .await
    }

    async fn stop_cluster(&self, application_id: &str, cluster_id: &str) -> DeployerResult<()> {
        self.platform
            .call("stop_cluster", self.app_type(), cluster_id, |state| {
                set_partition_state(state, "stop", application_id, cluster_id, platform::STATE_STOPPED)
            })
            .await
    }

    async fn destroy_cluster(&self, application_id: &str, cluster_id: &str) -> DeployerResult<()> {
        self.platform
            .call("destroy_cluster", self.app_type(), cluster_id, |state| {
                let clusters = partition_op(state, "destroy", application_id, cluster_id)?;
                clusters.remove(cluster_id).map(|_| ()).ok_or_else(|| {
                    DeployerError::partition_op("destroy", application_id, cluster_id, "no such cluster")
                })
            })
            .await
    }

    async fn list_clusters(&self, application_id: &str) -> DeployerResult<Vec<String>> {
        self.platform
            .call("list_clusters", self.app_type(), application_id, |state| {
                Ok(state
                    .partitions
                    .get(application_id)
                    .map(|clusters| clusters.keys().cloned().collect())
                    .unwrap_or_default())
            })
            .await
    }

    async fn cluster_info(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> DeployerResult<Option<PartitionState>> {
        self.platform
            .call("cluster_info", self.app_type(), cluster_id, |state| {
                Ok(state
                    .partitions
                    .get(application_id)
                    .and_then(|clusters| clusters.get(cluster_id))
                    .map(|record| PartitionState {
                        cluster_id: cluster_id.to_string(),
                        state: record.state.clone(),
                        members: if record.state == platform::STATE_RUNNING {
                            record.request.projection_any
                        } else {
                            0
                        },
                    }))
            })
            .await
    }
}
