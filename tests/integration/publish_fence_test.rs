//! Migrations against the in-process publish fence.

use std::sync::Arc;
use std::time::Duration;

use tideline::model::EventType;
use tideline::services::{ErrorKind, TimelineError};
use tideline::sync::LocalTimelineSync;

use crate::common::{Cluster, ORDERS, PAYMENTS};

const PUBLISH_WAIT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn test_switch_waits_for_in_flight_publish() {
    let sync = Arc::new(LocalTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;
    let mut changes = sync.subscribe_changes();

    let permit = sync.publish_permit(ORDERS, PUBLISH_WAIT).await.unwrap();

    let migration = {
        let service = cluster.service.clone();
        tokio::spawn(async move { service.create_and_start_timeline(ORDERS, "s0").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!migration.is_finished());
    assert_eq!(cluster.store.timeline_count().await, 0);

    drop(permit);
    let t0 = migration.await.unwrap().unwrap();

    assert!(!sync.is_fenced(ORDERS));
    assert_eq!(changes.recv().await.unwrap(), ORDERS);
    assert_eq!(
        cluster
            .service
            .get_timeline(&EventType::new(ORDERS))
            .await
            .unwrap()
            .id,
        t0.id
    );
    assert!(sync.publish_permit(ORDERS, PUBLISH_WAIT).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_stuck_publisher_times_out_the_switch() {
    let sync = Arc::new(LocalTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;

    let permit = sync.publish_permit(ORDERS, PUBLISH_WAIT).await.unwrap();

    let err = cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(!sync.is_fenced(ORDERS));
    assert_eq!(cluster.store.timeline_count().await, 0);

    // Nothing was left fenced behind the timeout.
    drop(permit);
    assert!(sync.publish_permit(ORDERS, PUBLISH_WAIT).await.is_ok());
}

#[tokio::test]
async fn test_failed_switch_resumes_publishing() {
    let sync = Arc::new(LocalTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;
    cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();

    cluster.store.set_fail_on_switch(true).await;
    let err = cluster
        .service
        .create_and_start_timeline(ORDERS, "s1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!sync.is_fenced(ORDERS));
    assert!(sync.publish_permit(ORDERS, PUBLISH_WAIT).await.is_ok());
    assert_eq!(cluster.store.timeline_count().await, 1);
}

#[tokio::test]
async fn test_same_stream_migrations_are_serialized() {
    let sync = Arc::new(LocalTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;
    cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();

    // Both migrations read the same active timeline before either is fenced.
    let permit = sync.publish_permit(ORDERS, PUBLISH_WAIT).await.unwrap();
    let migrations: Vec<_> = (0..2)
        .map(|_| {
            let service = cluster.service.clone();
            tokio::spawn(async move { service.create_and_start_timeline(ORDERS, "s1").await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(permit);

    let mut succeeded = 0;
    for migration in migrations {
        match migration.await.unwrap() {
            Ok(timeline) => {
                assert_eq!(timeline.order, 1);
                succeeded += 1;
            }
            Err(err) => assert_eq!(err.kind(), ErrorKind::InvalidState),
        }
    }
    assert_eq!(succeeded, 1);

    let timelines = cluster.service.list_timelines(ORDERS).await.unwrap();
    let mut orders: Vec<_> = timelines.iter().map(|t| t.order).collect();
    orders.sort();
    assert_eq!(orders, vec![0, 1]);
    assert_eq!(
        timelines.iter().filter(|t| t.last_position.is_none()).count(),
        1
    );
    assert!(!sync.is_fenced(ORDERS));
}

#[tokio::test]
async fn test_other_streams_migrate_while_one_is_fenced() {
    let sync = Arc::new(LocalTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;

    let permit = sync.publish_permit(ORDERS, PUBLISH_WAIT).await.unwrap();
    let orders = {
        let service = cluster.service.clone();
        tokio::spawn(async move { service.create_and_start_timeline(ORDERS, "s0").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let payments = cluster
        .service
        .create_and_start_timeline(PAYMENTS, "s0")
        .await
        .unwrap();
    assert_eq!(payments.order, 0);
    assert!(!sync.is_fenced(PAYMENTS));
    assert!(!orders.is_finished());

    drop(permit);
    let orders = orders.await.unwrap().unwrap();
    assert_eq!(orders.event_type, ORDERS);
    assert_eq!(cluster.store.timeline_count().await, 2);
    assert!(!sync.is_fenced(ORDERS));
}

#[tokio::test]
async fn test_concurrent_deletes_remove_the_timeline_once() {
    let sync = Arc::new(LocalTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;
    let t0 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();

    let permit = sync.publish_permit(ORDERS, PUBLISH_WAIT).await.unwrap();
    let deletes: Vec<_> = (0..2)
        .map(|_| {
            let service = cluster.service.clone();
            tokio::spawn(async move { service.delete_timeline(ORDERS, t0.id).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(permit);

    let mut outcomes = Vec::new();
    for delete in deletes {
        outcomes.push(delete.await.unwrap());
    }
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(TimelineError::NotLatestTimeline(id)) if *id == t0.id
    )));
    assert_eq!(cluster.store.timeline_count().await, 0);
    assert!(!sync.is_fenced(ORDERS));
}
