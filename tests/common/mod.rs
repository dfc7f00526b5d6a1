//! Shared harness for integration tests.
//!
//! Wires a `TimelineService` over in-memory collaborators: a default storage
//! `s0`, a second storage `s1`, and the event types `orders` and `payments`.

use std::sync::Arc;

use tideline::model::{EventType, Storage};
use tideline::services::TimelineService;
use tideline::storage::{MockEventTypeRepository, MockTimelineStore, TimelineStore};
use tideline::sync::TimelineSync;
use tideline::worker::{MockStorageWorker, MockWorkerFactory};

pub const ORDERS: &str = "orders";
pub const ORDERS_PARTITIONS: usize = 8;
pub const PAYMENTS: &str = "payments";

pub struct Cluster {
    pub store: Arc<MockTimelineStore>,
    pub s0: Arc<MockStorageWorker>,
    pub s1: Arc<MockStorageWorker>,
    pub service: Arc<TimelineService>,
}

impl Cluster {
    pub async fn start(sync: Arc<dyn TimelineSync>) -> Self {
        let default = Storage::in_memory("s0").as_default();
        let other = Storage::in_memory("s1");

        let store = Arc::new(MockTimelineStore::with_default(default.clone()).await);
        store
            .create_storage(&other)
            .await
            .expect("second storage");

        let event_types = Arc::new(MockEventTypeRepository::new());
        event_types.add(EventType::new(ORDERS)).await;
        event_types.add(EventType::new(PAYMENTS)).await;

        let workers = Arc::new(MockWorkerFactory::new());
        let s0 = workers.register(&default, 1);
        let s1 = workers.register(&other, 1);
        s0.add_topic(ORDERS, ORDERS_PARTITIONS).await;
        s0.add_topic(PAYMENTS, 2).await;

        let service = Arc::new(TimelineService::new(
            store.clone(),
            event_types,
            workers,
            sync,
        ));

        Self {
            store,
            s0,
            s1,
            service,
        }
    }
}
