//! End-to-end migration of an event type across storages.

use std::sync::Arc;

use tideline::model::{EventType, Position, VersionedCursor};
use tideline::services::{ErrorKind, TIMELINE_UPDATE_TIMEOUT};
use tideline::sync::{FenceCall, MockTimelineSync};

use crate::common::{Cluster, ORDERS, ORDERS_PARTITIONS};

fn position(offset: u64) -> Position {
    Position::new((0..ORDERS_PARTITIONS).map(|p| (p.to_string(), offset)))
}

#[tokio::test]
async fn test_event_type_walks_through_storages() {
    let sync = Arc::new(MockTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;
    let orders = EventType::new(ORDERS);

    // Before any timeline the event type is served from the default layout.
    let implicit = cluster.service.get_timeline(&orders).await.unwrap();
    assert!(implicit.fake);

    let t0 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();
    cluster.s0.set_position(ORDERS, position(100)).await;

    let t1 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s1")
        .await
        .unwrap();
    cluster
        .s1
        .set_position(&t1.configuration.topic, position(25))
        .await;

    let t2 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();

    let history = cluster.service.list_timelines(ORDERS).await.unwrap();
    assert_eq!(
        history.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![t0.id, t1.id, t2.id]
    );
    assert_eq!(history[0].last_position, Some(position(100)));
    assert_eq!(history[1].last_position, Some(position(25)));

    // Exactly one timeline is still open.
    let open: Vec<_> = history
        .iter()
        .filter(|t| t.last_position.is_none())
        .collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, t2.id);
    assert_eq!(
        cluster.service.get_timeline(&orders).await.unwrap().id,
        t2.id
    );

    // Every successor inherits the partition count.
    assert_eq!(
        cluster.s1.partitions_of(&t1.configuration.topic).await,
        Some(ORDERS_PARTITIONS)
    );
    assert_eq!(
        cluster.s0.partitions_of(&t2.configuration.topic).await,
        Some(ORDERS_PARTITIONS)
    );
    assert_ne!(t2.configuration.topic, t0.configuration.topic);

    // One fence cycle per switch.
    let calls = sync.calls().await;
    assert_eq!(calls.len(), 6);
    for cycle in calls.chunks(2) {
        assert_eq!(
            cycle,
            [
                FenceCall::Start {
                    event_type: ORDERS.to_string(),
                    timeout: TIMELINE_UPDATE_TIMEOUT,
                },
                FenceCall::Finish {
                    event_type: ORDERS.to_string(),
                },
            ]
        );
    }
}

#[tokio::test]
async fn test_cursors_resolve_across_history() {
    let sync = Arc::new(MockTimelineSync::new());
    let cluster = Cluster::start(sync).await;
    let orders = EventType::new(ORDERS);

    let t0 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();
    cluster
        .service
        .create_and_start_timeline(ORDERS, "s1")
        .await
        .unwrap();

    let old_cursor = VersionedCursor::V1 {
        partition: "3".to_string(),
        timeline_id: t0.id,
        offset: "000000000000000010".to_string(),
    };
    let resolved = cluster
        .service
        .resolve_timeline(&orders, &old_cursor)
        .await
        .unwrap();
    assert_eq!(resolved.id, t0.id);
    assert_eq!(resolved.storage.id, "s0");
    assert!(resolved.last_position.is_some());

    let legacy = VersionedCursor::V0 {
        partition: "3".to_string(),
        offset: "000000000000000010".to_string(),
    };
    let synthetic = cluster
        .service
        .resolve_timeline(&orders, &legacy)
        .await
        .unwrap();
    assert!(synthetic.fake);
    assert_eq!(synthetic.configuration.topic, ORDERS);
}

#[tokio::test]
async fn test_rejected_rules_leave_no_trace() {
    let sync = Arc::new(MockTimelineSync::new());
    let cluster = Cluster::start(sync.clone()).await;

    let off_default = cluster
        .service
        .create_and_start_timeline(ORDERS, "s1")
        .await
        .unwrap_err();
    assert_eq!(off_default.kind(), ErrorKind::InvalidArgument);

    let t0 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s0")
        .await
        .unwrap();
    let t1 = cluster
        .service
        .create_and_start_timeline(ORDERS, "s1")
        .await
        .unwrap();
    let fenced = sync.calls().await.len();

    for id in [t0.id, t1.id] {
        let err = cluster.service.delete_timeline(ORDERS, id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    let in_use = cluster.service.storages().delete("s1").await.unwrap_err();
    assert_eq!(in_use.kind(), ErrorKind::InvalidState);

    assert_eq!(sync.calls().await.len(), fenced);
    assert_eq!(cluster.store.timeline_count().await, 2);
}
