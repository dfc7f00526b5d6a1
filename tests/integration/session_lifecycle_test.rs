//! Session manager wired from configuration.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use tempfile::NamedTempFile;

use tideline::config::Config;
use tideline::coordination::mock::SessionEvent;
use tideline::coordination::{
    CoordinationError, MockEnsemble, SessionFactory, SessionManager, SessionOwnership,
    LOCK_SESSION_LIVE_PERIOD,
};

fn config() -> Config {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"
coordination:
  ensemble: "zookeeper://zk1:2181,zk2:2181,zk3:2181/tideline"
  session_timeout_ms: 10000
  connection_timeout_ms: 3000
timelines:
  max_commit_timeout_secs: 60
"#,
    )
    .unwrap();
    Config::load(file.path().to_str()).unwrap()
}

async fn manager(config: &Config, ensemble: &Arc<MockEnsemble>) -> SessionManager {
    let factory = SessionFactory::new(
        ensemble.clone(),
        config.coordination.connection().unwrap(),
        config.coordination.connection_timeout(),
    )
    .unwrap();
    SessionManager::connect(factory, config.session_settings())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_sessions_follow_configuration() {
    let config = config();
    let ensemble = Arc::new(MockEnsemble::new());
    let manager = manager(&config, &ensemble).await;

    let primary = manager.primary();
    assert_eq!(primary.params().connect_string, "zk1:2181,zk2:2181,zk3:2181");
    assert_eq!(primary.params().chroot, "/tideline");
    assert_eq!(primary.params().connection_timeout, Duration::from_secs(3));

    let shared = manager
        .subscription_session(Duration::from_secs(60))
        .await
        .unwrap();
    let again = manager
        .subscription_session(Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(shared.ownership(), SessionOwnership::Shared);
    assert_eq!(shared.id(), again.id());
    shared.close();
    assert!(!again.is_closed());

    let custom = manager
        .subscription_session(Duration::from_secs(5))
        .await
        .unwrap();
    let custom_id = custom.id();
    assert_eq!(custom.ownership(), SessionOwnership::Owned);
    assert_ne!(custom_id, again.id());
    custom.close();
    assert!(ensemble.events().contains(&SessionEvent::Closed(custom_id)));
    assert!(!again.is_closed());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_lock_session_lifecycle_until_shutdown() {
    let config = config();
    let ensemble = Arc::new(MockEnsemble::new());
    let manager = manager(&config, &ensemble).await;

    let first = manager.lock_session().await.unwrap();
    tokio::time::advance(LOCK_SESSION_LIVE_PERIOD / 2).await;
    assert_eq!(manager.lock_session().await.unwrap().id(), first.id());

    tokio::time::advance(LOCK_SESSION_LIVE_PERIOD).await;
    let second = manager.lock_session().await.unwrap();
    assert_ne!(second.id(), first.id());
    assert!(first.is_closed());

    manager.shutdown().await;
    assert!(second.is_closed());
    assert!(manager.primary().is_closed());
    assert_eq!(ensemble.open_sessions(), 0);
}

#[tokio::test]
async fn test_exhibitor_ensemble_is_rejected_at_startup() {
    let ensemble = Arc::new(MockEnsemble::new());
    let connection = "exhibitor://exhibitor:8181/tideline".parse().unwrap();

    let result = SessionFactory::new(ensemble.clone(), connection, Duration::from_secs(3));

    assert!(matches!(
        result,
        Err(CoordinationError::UnsupportedEnsemble(_))
    ));
    assert_eq!(ensemble.open_attempts(), 0);
}
