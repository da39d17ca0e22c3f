use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::context::ExtendedState;
use super::errors::{missing_header, ActionResult};
use super::events::{EventHeaders, WorkflowMessage};
use crate::cluster::{shared_stream_name, ClusterControlFacade};
use crate::config::StreamConfig;
use crate::constants::headers::{APP_NAME, APP_VERSION, CLUSTER_ID, MODULE};
use crate::models::{CloudAppType, ClusterPartition};

/// What the engine does once an action returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Follow the state's completion transition
    Continue,
    /// Process this event from the current state instead
    Raise(WorkflowMessage),
}

/// Trait for state entry actions
#[async_trait]
pub trait StateAction: Send + Sync {
    /// Execute the action. Actions may call the cluster and may only mutate
    /// the extended state.
    async fn execute(
        &self,
        headers: &EventHeaders,
        extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

fn required<'a>(value: &'a Option<String>, header: &str) -> ActionResult<&'a str> {
    value.as_deref().ok_or_else(|| missing_header(header))
}

/// Clears extended state on entry to a composite
pub struct ResetVariablesAction;

#[async_trait]
impl StateAction for ResetVariablesAction {
    async fn execute(
        &self,
        _headers: &EventHeaders,
        extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        extended.clear();
        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Reset workflow variables"
    }
}

/// Records the requested version when its bundle is already stored
pub struct CheckAppAction {
    facade: Arc<ClusterControlFacade>,
    app_type: CloudAppType,
}

impl CheckAppAction {
    pub fn new(facade: Arc<ClusterControlFacade>, app_type: CloudAppType) -> Self {
        Self { facade, app_type }
    }
}

#[async_trait]
impl StateAction for CheckAppAction {
    async fn execute(
        &self,
        headers: &EventHeaders,
        extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        let Some(version) = headers.app_version.as_deref() else {
            return Ok(ActionOutcome::Raise(WorkflowMessage::error(format!(
                "{} not defined",
                APP_VERSION
            ))));
        };

        let bundles = self.facade.get_bundles(self.app_type).await?;
        if bundles.iter().any(|bundle| bundle.name == version) {
            debug!(app_type = %self.app_type, app_version = %version, "Bundle already stored");
            extended.app_version = Some(version.to_string());
        }

        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Check whether the application bundle is stored"
    }
}

pub struct PushAppAction {
    facade: Arc<ClusterControlFacade>,
    app_type: CloudAppType,
}

impl PushAppAction {
    pub fn new(facade: Arc<ClusterControlFacade>, app_type: CloudAppType) -> Self {
        Self { facade, app_type }
    }
}

#[async_trait]
impl StateAction for PushAppAction {
    async fn execute(
        &self,
        headers: &EventHeaders,
        _extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        let version = required(&headers.app_version, APP_VERSION)?;
        info!(app_type = %self.app_type, app_version = %version, "Pushing application bundle");
        self.facade.push_bundle(version, self.app_type).await?;
        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Push the application bundle"
    }
}

/// Launches one task application with the request's launch arguments
pub struct TaskStartInstanceAction {
    facade: Arc<ClusterControlFacade>,
}

impl TaskStartInstanceAction {
    pub fn new(facade: Arc<ClusterControlFacade>) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl StateAction for TaskStartInstanceAction {
    async fn execute(
        &self,
        headers: &EventHeaders,
        extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        let version = required(&headers.app_version, APP_VERSION)?;
        let application_id = self
            .facade
            .submit_application(version, CloudAppType::Task, &headers.context_run_args)
            .await?;

        info!(application_id = %application_id, "Task application submitted");
        extended.application_id = Some(application_id);
        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Submit the task application"
    }
}

/// Reuses or launches the shared stream application, then creates and starts
/// the module's partition inside it
pub struct StreamFinalizeAction {
    facade: Arc<ClusterControlFacade>,
    settings: StreamConfig,
}

impl StreamFinalizeAction {
    pub fn new(facade: Arc<ClusterControlFacade>, settings: StreamConfig) -> Self {
        Self { facade, settings }
    }
}

#[async_trait]
impl StateAction for StreamFinalizeAction {
    async fn execute(
        &self,
        headers: &EventHeaders,
        extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        let version = required(&headers.app_version, APP_VERSION)?;
        let cluster_id = required(&headers.cluster_id, CLUSTER_ID)?;
        let module = required(&headers.module, MODULE)?;
        let count = headers.count.unwrap_or(self.settings.default_count);

        let application_id = match find_shared_instance(&self.facade, version).await? {
            Some(application_id) => {
                debug!(application_id = %application_id, "Reusing running stream application");
                application_id
            }
            None => {
                self.facade
                    .submit_application(version, CloudAppType::Stream, &[])
                    .await?
            }
        };
        extended.application_id = Some(application_id.clone());

        let partition = ClusterPartition::new(
            cluster_id,
            module,
            headers.definition_parameters.clone(),
        );
        // a stopped or never-started partition from an earlier deploy is restarted in place
        let existing = self.facade.list_cluster_partitions(&application_id).await?;
        if existing.contains(cluster_id) {
            debug!(cluster_id = %cluster_id, "Partition already present, skipping create");
        } else {
            self.facade
                .create_cluster_partition(
                    &application_id,
                    cluster_id,
                    &self.settings.cluster_template,
                    &self.settings.projection,
                    count,
                    partition.extra_properties(),
                )
                .await?;
        }
        self.facade
            .start_cluster_partition(&application_id, cluster_id)
            .await?;

        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Create and start the stream module partition"
    }
}

/// Kills every task instance carrying the requested name
pub struct TaskKillAction {
    facade: Arc<ClusterControlFacade>,
}

impl TaskKillAction {
    pub fn new(facade: Arc<ClusterControlFacade>) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl StateAction for TaskKillAction {
    async fn execute(
        &self,
        headers: &EventHeaders,
        _extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        let name = required(&headers.app_name, APP_NAME)?;
        self.facade.kill_instances(name, CloudAppType::Task).await?;
        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Kill task instances by name"
    }
}

/// Stops the module's partition in the shared stream application
pub struct StreamStopPartitionAction {
    facade: Arc<ClusterControlFacade>,
}

impl StreamStopPartitionAction {
    pub fn new(facade: Arc<ClusterControlFacade>) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl StateAction for StreamStopPartitionAction {
    async fn execute(
        &self,
        headers: &EventHeaders,
        extended: &mut ExtendedState,
    ) -> ActionResult<ActionOutcome> {
        let version = required(&headers.app_version, APP_VERSION)?;
        let cluster_id = required(&headers.cluster_id, CLUSTER_ID)?;

        let Some(application_id) = find_shared_instance(&self.facade, version).await? else {
            debug!(cluster_id = %cluster_id, "No running stream application, nothing to stop");
            return Ok(ActionOutcome::Raise(WorkflowMessage::continue_event()));
        };
        extended.application_id = Some(application_id.clone());

        let partitions = self.facade.list_cluster_partitions(&application_id).await?;
        if partitions.contains(cluster_id) {
            self.facade
                .stop_cluster_partition(&application_id, cluster_id)
                .await?;
        } else {
            debug!(
                application_id = %application_id,
                cluster_id = %cluster_id,
                "Partition not present, skipping stop"
            );
        }

        Ok(ActionOutcome::Continue)
    }

    fn description(&self) -> &'static str {
        "Stop the stream module partition"
    }
}

async fn find_shared_instance(
    facade: &ClusterControlFacade,
    version: &str,
) -> ActionResult<Option<String>> {
    let shared_name = shared_stream_name(version);
    let instances = facade.get_instances(CloudAppType::Stream).await?;
    Ok(instances
        .into_iter()
        .find(|instance| instance.is_running() && instance.name == shared_name)
        .map(|instance| instance.application_id))
}
