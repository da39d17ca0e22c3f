//! # Cluster Control Facade
//!
//! Operations the workflow engine and the module deployers issue against the
//! cluster platform. Every call goes through the session cache:
//!
//! | Operation | Session key |
//! |-----------|-------------|
//! | listings, partition operations | `(type, none, [])` |
//! | `push_bundle` | `(type, version, [])` |
//! | `submit_application` | `(type, version, extra args)` |
//!
//! Partition operations always address the stream application type.
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use std::sync::Arc;
//! use yarn_deployer::cluster::{ClusterControlFacade, InMemoryClusterService};
//! use yarn_deployer::models::CloudAppType;
//!
//! let platform = InMemoryClusterService::new().with_bundle(CloudAppType::Task, "app");
//! let facade = ClusterControlFacade::new(Arc::new(platform), None);
//!
//! let bundles = facade.get_bundles(CloudAppType::Task).await.unwrap();
//! assert!(bundles.iter().any(|bundle| bundle.name == "app"));
//! # });
//! ```

use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::service::{ClusterSession, SessionFactory};
use super::session::{ServiceSessionKey, SessionCache};
use crate::constants::naming;
use crate::error::{DeployerError, DeployerResult};
use crate::logging::log_cluster_operation;
use crate::models::{BundleInfo, CloudAppType, InstanceInfo, PartitionCreateRequest, PartitionState};

#[derive(Debug)]
pub struct ClusterControlFacade {
    sessions: SessionCache,
}

impl ClusterControlFacade {
    pub fn new(factory: Arc<dyn SessionFactory>, dataflow_version: Option<String>) -> Self {
        Self {
            sessions: SessionCache::new(factory, dataflow_version),
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    async fn session(&self, key: ServiceSessionKey) -> DeployerResult<Arc<dyn ClusterSession>> {
        self.sessions.get_or_create(&key).await
    }

    async fn partition_session(&self) -> DeployerResult<Arc<dyn ClusterSession>> {
        self.session(ServiceSessionKey::unversioned(CloudAppType::Stream))
            .await
    }

    pub async fn get_bundles(&self, app_type: CloudAppType) -> DeployerResult<HashSet<BundleInfo>> {
        let session = self.session(ServiceSessionKey::unversioned(app_type)).await?;
        Ok(session.list_bundles().await?.into_iter().collect())
    }

    pub async fn get_instances(
        &self,
        app_type: CloudAppType,
    ) -> DeployerResult<HashSet<InstanceInfo>> {
        let session = self.session(ServiceSessionKey::unversioned(app_type)).await?;
        Ok(session.list_instances().await?.into_iter().collect())
    }

    pub async fn push_bundle(&self, version: &str, app_type: CloudAppType) -> DeployerResult<()> {
        let session = self
            .session(ServiceSessionKey::new(app_type, Some(version), &[]))
            .await?;
        session.push_bundle(version).await?;
        log_cluster_operation("push_bundle", app_type, None, None, "success", Some(version));
        Ok(())
    }

    /// Launch a new application instance, returning its platform id
    pub async fn submit_application(
        &self,
        version: &str,
        app_type: CloudAppType,
        extra_args: &[String],
    ) -> DeployerResult<String> {
        let session = self
            .session(ServiceSessionKey::new(app_type, Some(version), extra_args))
            .await?;
        let application_id = session.submit_application().await.map_err(|e| match e {
            DeployerError::SubmissionError(_) => e,
            other => DeployerError::submission(other.to_string()),
        })?;
        log_cluster_operation(
            "submit_application",
            app_type,
            Some(&application_id),
            None,
            "success",
            Some(version),
        );
        Ok(application_id)
    }

    /// Kill every instance whose reported name equals `name`, returning how many were killed
    pub async fn kill_instances(&self, name: &str, app_type: CloudAppType) -> DeployerResult<usize> {
        let session = self.session(ServiceSessionKey::unversioned(app_type)).await?;
        let matching: Vec<InstanceInfo> = session
            .list_instances()
            .await?
            .into_iter()
            .filter(|instance| instance.name == name)
            .collect();

        for instance in &matching {
            session.kill_application(&instance.application_id).await?;
            log_cluster_operation(
                "kill_application",
                app_type,
                Some(&instance.application_id),
                None,
                "success",
                Some(name),
            );
        }

        debug!(name = %name, app_type = %app_type, killed = matching.len(), "Kill request handled");
        Ok(matching.len())
    }

    pub async fn create_cluster_partition(
        &self,
        application_id: &str,
        cluster_id: &str,
        template: &str,
        projection: &str,
        count: u32,
        extra_properties: BTreeMap<String, String>,
    ) -> DeployerResult<()> {
        let request = PartitionCreateRequest {
            cluster_id: cluster_id.to_string(),
            cluster_def: template.to_string(),
            projection: projection.to_string(),
            projection_any: count,
            extra_properties,
        };

        let session = self.partition_session().await?;
        session
            .create_cluster(application_id, &request)
            .await
            .map_err(|e| partition_failure("create", application_id, cluster_id, e))?;
        log_cluster_operation(
            "create_cluster",
            CloudAppType::Stream,
            Some(application_id),
            Some(cluster_id),
            "success",
            None,
        );
        Ok(())
    }

    pub async fn start_cluster_partition(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> DeployerResult<()> {
        let session = self.partition_session().await?;
        session
            .start_cluster(application_id, cluster_id)
            .await
            .map_err(|e| partition_failure("start", application_id, cluster_id, e))?;
        log_cluster_operation(
            "start_cluster",
            CloudAppType::Stream,
            Some(application_id),
            Some(cluster_id),
            "success",
            None,
        );
        Ok(())
    }

    pub async fn stop_cluster_partition(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> DeployerResult<()> {
        let session = self.partition_session().await?;
        session
            .stop_cluster(application_id, cluster_id)
            .await
            .map_err(|e| partition_failure("stop", application_id, cluster_id, e))?;
        log_cluster_operation(
            "stop_cluster",
            CloudAppType::Stream,
            Some(application_id),
            Some(cluster_id),
            "success",
            None,
        );
        Ok(())
    }

    pub async fn destroy_cluster_partition(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> DeployerResult<()> {
        let session = self.partition_session().await?;
        session
            .destroy_cluster(application_id, cluster_id)
            .await
            .map_err(|e| partition_failure("destroy", application_id, cluster_id, e))?;
        log_cluster_operation(
            "destroy_cluster",
            CloudAppType::Stream,
            Some(application_id),
            Some(cluster_id),
            "success",
            None,
        );
        Ok(())
    }

    pub async fn list_cluster_partitions(
        &self,
        application_id: &str,
    ) -> DeployerResult<BTreeSet<String>> {
        let session = self.partition_session().await?;
        let clusters = session
            .list_clusters(application_id)
            .await
            .map_err(|e| partition_failure("list", application_id, "*", e))?;
        Ok(clusters.into_iter().collect())
    }

    pub async fn get_partition_state(
        &self,
        application_id: &str,
        cluster_id: &str,
    ) -> DeployerResult<Option<PartitionState>> {
        let session = self.partition_session().await?;
        session
            .cluster_info(application_id, cluster_id)
            .await
            .map_err(|e| partition_failure("describe", application_id, cluster_id, e))
    }

    /// State of every partition hosted by the running shared stream application
    /// for `app_version`, keyed by cluster id
    pub async fn cluster_partition_states(
        &self,
        app_version: &str,
    ) -> DeployerResult<BTreeMap<String, String>> {
        let shared_name = shared_stream_name(app_version);
        let application_ids: Vec<String> = self
            .get_instances(CloudAppType::Stream)
            .await?
            .into_iter()
            .filter(|instance| instance.is_running() && instance.name == shared_name)
            .map(|instance| instance.application_id)
            .collect();

        let mut states = BTreeMap::new();
        for application_id in &application_ids {
            let clusters = self.list_cluster_partitions(application_id).await?;
            let described = try_join_all(
                clusters
                    .iter()
                    .map(|cluster_id| self.get_partition_state(application_id, cluster_id)),
            )
            .await?;

            for state in described.into_iter().flatten() {
                states.insert(state.cluster_id, state.state);
            }
        }

        Ok(states)
    }
}

/// Name of the shared stream application hosting partitions for `app_version`
pub fn shared_stream_name(app_version: &str) -> String {
    format!("{}{}{}", naming::STREAM_KIND, naming::DELIMITER, app_version)
}

fn partition_failure(
    operation: &str,
    application_id: &str,
    cluster_id: &str,
    error: DeployerError,
) -> DeployerError {
    match error {
        DeployerError::PartitionOpError { .. } | DeployerError::SessionInitError { .. } => error,
        other => DeployerError::partition_op(operation, application_id, cluster_id, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::InMemoryClusterService;

    fn facade(platform: &InMemoryClusterService) -> ClusterControlFacade {
        ClusterControlFacade::new(Arc::new(platform.clone()), Some("1.0.0".to_string()))
    }

    #[tokio::test]
    async fn test_submit_requires_pushed_bundle() {
        let platform = InMemoryClusterService::new();
        let facade = facade(&platform);

        let err = facade
            .submit_application("app", CloudAppType::Task, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::SubmissionError(_)));

        facade.push_bundle("app", CloudAppType::Task).await.unwrap();
        let application_id = facade
            .submit_application("app", CloudAppType::Task, &[])
            .await
            .unwrap();
        assert!(application_id.starts_with("application_"));
    }

    #[tokio::test]
    async fn test_session_keys_per_operation() {
        let platform = InMemoryClusterService::new();
        let facade = facade(&platform);

        facade.get_bundles(CloudAppType::Stream).await.unwrap();
        facade.get_instances(CloudAppType::Stream).await.unwrap();
        facade.push_bundle("app", CloudAppType::Stream).await.unwrap();
        facade
            .submit_application("app", CloudAppType::Stream, &[])
            .await
            .unwrap();
        facade
            .submit_application("app", CloudAppType::Stream, &["--x=1".to_string()])
            .await
            .unwrap();

        // unversioned, (app, []) and (app, [--x=1])
        assert_eq!(platform.sessions_created(), 3);
        assert_eq!(facade.sessions().len(), 3);

        let bootstraps = platform.bootstraps();
        assert!(bootstraps
            .iter()
            .all(|b| b.launch_args[0] == "--spring.config.name=stream"));
        assert!(bootstraps
            .iter()
            .all(|b| b.dataflow_version.as_deref() == Some("1.0.0")));
    }

    #[tokio::test]
    async fn test_kill_matches_exact_name() {
        let platform = InMemoryClusterService::new();
        platform.add_instance(
            CloudAppType::Task,
            InstanceInfo::new("application_9_0001", "scdtask:g:l", "RUNNING", "http://h1"),
        );
        platform.add_instance(
            CloudAppType::Task,
            InstanceInfo::new("application_9_0002", "scdtask:g:l2", "RUNNING", "http://h2"),
        );
        let facade = facade(&platform);

        let killed = facade.kill_instances("scdtask:g:l", CloudAppType::Task).await.unwrap();
        assert_eq!(killed, 1);

        let instances = facade.get_instances(CloudAppType::Task).await.unwrap();
        let still_running: Vec<_> = instances.iter().filter(|i| i.is_running()).collect();
        assert_eq!(still_running.len(), 1);
        assert_eq!(still_running[0].name, "scdtask:g:l2");
    }

    #[tokio::test]
    async fn test_partition_lifecycle_and_states() {
        let platform = InMemoryClusterService::new();
        let facade = facade(&platform);
        facade.push_bundle("app", CloudAppType::Stream).await.unwrap();
        let application_id = facade
            .submit_application("app", CloudAppType::Stream, &[])
            .await
            .unwrap();

        facade
            .create_cluster_partition(
                &application_id,
                "scdstream:ticktock:time",
                "module-template",
                "default",
                2,
                BTreeMap::new(),
            )
            .await
            .unwrap();
        facade
            .start_cluster_partition(&application_id, "scdstream:ticktock:time")
            .await
            .unwrap();

        let states = facade.cluster_partition_states("app").await.unwrap();
        assert_eq!(states.get("scdstream:ticktock:time").map(String::as_str), Some("RUNNING"));

        let state = facade
            .get_partition_state(&application_id, "scdstream:ticktock:time")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.members, 2);

        facade
            .stop_cluster_partition(&application_id, "scdstream:ticktock:time")
            .await
            .unwrap();
        facade
            .destroy_cluster_partition(&application_id, "scdstream:ticktock:time")
            .await
            .unwrap();
        assert!(facade
            .list_cluster_partitions(&application_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_partition_failure_is_typed() {
        let platform = InMemoryClusterService::new();
        let facade = facade(&platform);

        let err = facade
            .start_cluster_partition("application_missing", "scdstream:g:l")
            .await
            .unwrap_err();
        match err {
            DeployerError::PartitionOpError {
                operation,
                application_id,
                ..
            } => {
                assert_eq!(operation, "start");
                assert_eq!(application_id, "application_missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
