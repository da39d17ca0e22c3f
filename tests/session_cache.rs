//! Session cache behaviour under concurrent access

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use yarn_deployer::cluster::{ServiceSessionKey, SessionCache};
use yarn_deployer::models::CloudAppType;
use yarn_deployer::{DeployerError, InMemoryClusterService};

#[tokio::test]
async fn concurrent_requests_for_one_key_create_one_session() {
    let platform = InMemoryClusterService::new();
    platform.set_latency(Duration::from_millis(10));
    let cache = Arc::new(SessionCache::new(Arc::new(platform.clone()), None));
    let key = ServiceSessionKey::new(CloudAppType::Stream, Some("app"), &[]);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get_or_create(&key).await })
        })
        .collect();

    let sessions: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(platform.sessions_created(), 1);
    assert!(sessions.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn distinct_keys_create_distinct_sessions() {
    let platform = InMemoryClusterService::new();
    let cache = SessionCache::new(Arc::new(platform.clone()), Some("1.0.0".to_string()));

    let args = vec!["--spring.yarn.appName=scdtask:a:b".to_string()];
    let keys = [
        ServiceSessionKey::unversioned(CloudAppType::Stream),
        ServiceSessionKey::unversioned(CloudAppType::Task),
        ServiceSessionKey::new(CloudAppType::Task, Some("app"), &[]),
        ServiceSessionKey::new(CloudAppType::Task, Some("app"), &args),
    ];
    for key in &keys {
        cache.get_or_create(key).await.unwrap();
        cache.get_or_create(key).await.unwrap();
    }

    assert_eq!(platform.sessions_created(), keys.len());
    assert!(keys.iter().all(|key| cache.contains(key)));
}

#[tokio::test]
async fn failed_initialization_is_reported_and_not_cached() {
    let platform = InMemoryClusterService::new();
    platform.fail_session_init("resource manager unreachable");
    let cache = SessionCache::new(Arc::new(platform.clone()), None);
    let key = ServiceSessionKey::unversioned(CloudAppType::Task);

    let err = cache.get_or_create(&key).await.err().expect("expected session init to fail");
    match err {
        DeployerError::SessionInitError { reason, .. } => {
            assert!(reason.contains("resource manager unreachable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!cache.contains(&key));

    platform.clear_failures();
    cache.get_or_create(&key).await.unwrap();
    assert!(cache.contains(&key));
    assert_eq!(platform.sessions_created(), 1);
}
