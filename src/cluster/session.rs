//! # Service Session Cache
//!
//! One long-lived service session per `(app type, version, extra launch args)`
//! key, created lazily and kept for the lifetime of the process.
//!
//! Concurrent lookups for the same key wait behind a single initializer, so the
//! factory is invoked at most once per key while it keeps succeeding. A failed
//! initialization leaves the slot empty and the next lookup tries again.
//! Sessions are never evicted.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::service::{ClusterSession, SessionFactory};
use crate::constants::launch;
use crate::error::{DeployerError, DeployerResult};
use crate::models::CloudAppType;

/// Cache key for a service session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceSessionKey {
    pub app_type: CloudAppType,
    pub version: Option<String>,
    pub extra_args: Vec<String>,
}

impl ServiceSessionKey {
    pub fn new(app_type: CloudAppType, version: Option<&str>, extra_args: &[String]) -> Self {
        Self {
            app_type,
            version: version.map(str::to_string),
            extra_args: extra_args.to_vec(),
        }
    }

    /// Key used by listing and partition operations
    pub fn unversioned(app_type: CloudAppType) -> Self {
        Self::new(app_type, None, &[])
    }
}

impl fmt::Display for ServiceSessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:[{}]",
            self.app_type,
            self.version.as_deref().unwrap_or("-"),
            self.extra_args.join(",")
        )
    }
}

/// Execution context handed to a [`SessionFactory`] when a session is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBootstrap {
    pub app_type: CloudAppType,
    pub app_version: Option<String>,
    pub dataflow_version: Option<String>,
    /// `--spring.config.name=<type>` followed by the key's extra args in order
    pub launch_args: Vec<String>,
}

impl SessionBootstrap {
    pub fn from_key(key: &ServiceSessionKey, dataflow_version: Option<&str>) -> Self {
        let mut launch_args = Vec::with_capacity(key.extra_args.len() + 1);
        launch_args.push(format!("{}{}", launch::CONFIG_NAME_ARG, key.app_type.as_str()));
        launch_args.extend(key.extra_args.iter().cloned());

        Self {
            app_type: key.app_type,
            app_version: key.version.clone(),
            dataflow_version: dataflow_version.map(str::to_string),
            launch_args,
        }
    }

    /// Value of the first launch argument starting with `prefix`
    pub fn launch_arg(&self, prefix: &str) -> Option<&str> {
        self.launch_args
            .iter()
            .find_map(|arg| arg.strip_prefix(prefix))
    }
}

type SessionSlot = Arc<OnceCell<Arc<dyn ClusterSession>>>;

/// Process-wide cache of service sessions
pub struct SessionCache {
    factory: Arc<dyn SessionFactory>,
    dataflow_version: Option<String>,
    sessions: DashMap<ServiceSessionKey, SessionSlot>,
}

impl SessionCache {
    pub fn new(factory: Arc<dyn SessionFactory>, dataflow_version: Option<String>) -> Self {
        Self {
            factory,
            dataflow_version,
            sessions: DashMap::new(),
        }
    }

    /// Return the session for `key`, building it on first use
    pub async fn get_or_create(
        &self,
        key: &ServiceSessionKey,
    ) -> DeployerResult<Arc<dyn ClusterSession>> {
        // Shard lock is released at the end of this statement, before any await
        let slot: SessionSlot = self
            .sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let session = slot
            .get_or_try_init(|| async {
                let bootstrap = SessionBootstrap::from_key(key, self.dataflow_version.as_deref());
                debug!(
                    session_key = %key,
                    launch_args = ?bootstrap.launch_args,
                    "Creating service session"
                );

                let session = self
                    .factory
                    .create_session(&bootstrap)
                    .await
                    .map_err(|e| DeployerError::SessionInitError {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;

                info!(session_key = %key, "Service session created");
                Ok::<_, DeployerError>(session)
            })
            .await?;

        Ok(Arc::clone(session))
    }

    /// Number of keys holding an initialized session
    pub fn len(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ServiceSessionKey) -> bool {
        self.sessions
            .get(key)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCache")
            .field("dataflow_version", &self.dataflow_version)
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::InMemoryClusterService;

    #[test]
    fn test_bootstrap_launch_args() {
        let key = ServiceSessionKey::new(
            CloudAppType::Task,
            Some("app"),
            &["--spring.yarn.appName=scdtask:g:l".to_string()],
        );
        let bootstrap = SessionBootstrap::from_key(&key, Some("1.0.0"));

        assert_eq!(
            bootstrap.launch_args,
            vec![
                "--spring.config.name=task".to_string(),
                "--spring.yarn.appName=scdtask:g:l".to_string(),
            ]
        );
        assert_eq!(bootstrap.launch_arg("--spring.yarn.appName="), Some("scdtask:g:l"));
        assert_eq!(bootstrap.dataflow_version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_key_identity_includes_args() {
        let plain = ServiceSessionKey::new(CloudAppType::Stream, Some("app"), &[]);
        let with_args =
            ServiceSessionKey::new(CloudAppType::Stream, Some("app"), &["--x".to_string()]);
        assert_ne!(plain, with_args);
        assert_eq!(plain, ServiceSessionKey::new(CloudAppType::Stream, Some("app"), &[]));
        assert_eq!(plain.to_string(), "stream:app:[]");
    }

    #[tokio::test]
    async fn test_same_key_reuses_session() {
        let platform = InMemoryClusterService::new();
        let cache = SessionCache::new(Arc::new(platform.clone()), None);
        let key = ServiceSessionKey::unversioned(CloudAppType::Stream);

        let first = cache.get_or_create(&key).await.unwrap();
        let second = cache.get_or_create(&key).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(platform.sessions_created(), 1);
        assert!(cache.contains(&key));
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let platform = InMemoryClusterService::new();
        platform.fail_session_init("client unavailable");
        let cache = SessionCache::new(Arc::new(platform.clone()), None);
        let key = ServiceSessionKey::unversioned(CloudAppType::Task);

        let err = cache.get_or_create(&key).await.err().unwrap();
        assert!(matches!(err, DeployerError::SessionInitError { .. }));
        assert!(cache.is_empty());

        platform.clear_failures();
        cache.get_or_create(&key).await.unwrap();
        assert_eq!(cache.len(), 1);
    }
}
