//! Mock storage workers for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Result, StorageWorker, StorageWorkerFactory, TopicRepository, WorkerError};
use crate::model::{EventType, EventTypeConfiguration, Position, Storage, Timeline};

/// Arguments of one `create_event_type_configuration` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRequest {
    pub event_type: String,
    pub partitions: Option<usize>,
    pub first_timeline: bool,
}

/// Mock worker keeping topics and positions in memory.
pub struct MockStorageWorker {
    storage: Storage,
    default_partitions: usize,
    topics: RwLock<HashMap<String, usize>>,
    positions: RwLock<HashMap<String, Position>>,
    requests: RwLock<Vec<ConfigurationRequest>>,
    fail_on_position: RwLock<bool>,
}

impl MockStorageWorker {
    pub fn new(storage: Storage, default_partitions: usize) -> Self {
        Self {
            storage,
            default_partitions,
            topics: RwLock::new(HashMap::new()),
            positions: RwLock::new(HashMap::new()),
            requests: RwLock::new(Vec::new()),
            fail_on_position: RwLock::new(false),
        }
    }

    /// Declare an existing topic with `partitions` partitions.
    pub async fn add_topic(&self, topic: &str, partitions: usize) {
        self.topics.write().await.insert(topic.to_string(), partitions);
    }

    pub async fn set_position(&self, topic: &str, position: Position) {
        self.positions
            .write()
            .await
            .insert(topic.to_string(), position);
    }

    pub async fn set_fail_on_position(&self, fail: bool) {
        *self.fail_on_position.write().await = fail;
    }

    pub async fn requests(&self) -> Vec<ConfigurationRequest> {
        self.requests.read().await.clone()
    }

    pub async fn partitions_of(&self, topic: &str) -> Option<usize> {
        self.topics.read().await.get(topic).copied()
    }
}

#[async_trait]
impl TopicRepository for MockStorageWorker {
    async fn list_partition_names(
        &self,
        configuration: &EventTypeConfiguration,
    ) -> Result<Vec<String>> {
        let count = self
            .topics
            .read()
            .await
            .get(&configuration.topic)
            .copied()
            .ok_or_else(|| WorkerError::TopicNotFound(configuration.topic.clone()))?;
        Ok((0..count).map(|p| p.to_string()).collect())
    }
}

#[async_trait]
impl StorageWorker for MockStorageWorker {
    fn storage(&self) -> &Storage {
        &self.storage
    }

    fn topic_repository(&self) -> &dyn TopicRepository {
        self
    }

    async fn create_event_type_configuration(
        &self,
        event_type: &EventType,
        partitions: Option<usize>,
        first_timeline: bool,
    ) -> Result<EventTypeConfiguration> {
        self.requests.write().await.push(ConfigurationRequest {
            event_type: event_type.name.clone(),
            partitions,
            first_timeline,
        });

        let mut topics = self.topics.write().await;
        let topic = if first_timeline {
            // Adopt the topic the event type already lives on.
            event_type.name.clone()
        } else {
            format!("{}-{}", event_type.name, topics.len())
        };
        topics
            .entry(topic.clone())
            .or_insert_with(|| partitions.unwrap_or(self.default_partitions));
        Ok(EventTypeConfiguration::new(topic))
    }

    async fn create_fake_timeline(&self, event_type: &EventType) -> Result<Timeline> {
        self.topics
            .write()
            .await
            .entry(event_type.name.clone())
            .or_insert(self.default_partitions);
        Ok(Timeline::fake(
            event_type.name.clone(),
            self.storage.clone(),
            EventTypeConfiguration::new(event_type.name.clone()),
        ))
    }

    async fn latest_position(&self, timeline: &Timeline) -> Result<Position> {
        if *self.fail_on_position.read().await {
            return Err(WorkerError::Backend("mock position failure".to_string()));
        }
        let topic = &timeline.configuration.topic;
        if let Some(position) = self.positions.read().await.get(topic) {
            return Ok(position.clone());
        }
        let partitions = self.list_partition_names(&timeline.configuration).await?;
        Ok(Position::new(partitions.into_iter().map(|p| (p, 0))))
    }
}

/// Mock factory handing out registered workers.
#[derive(Default)]
pub struct MockWorkerFactory {
    workers: StdRwLock<HashMap<String, Arc<MockStorageWorker>>>,
}

impl MockWorkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker for `storage`.
    pub fn register(&self, storage: &Storage, default_partitions: usize) -> Arc<MockStorageWorker> {
        let worker = Arc::new(MockStorageWorker::new(storage.clone(), default_partitions));
        if let Ok(mut workers) = self.workers.write() {
            workers.insert(storage.id.clone(), worker.clone());
        }
        worker
    }
}

impl StorageWorkerFactory for MockWorkerFactory {
    fn worker(&self, storage: &Storage) -> Result<Arc<dyn StorageWorker>> {
        let workers = self
            .workers
            .read()
            .map_err(|_| WorkerError::Backend("worker registry poisoned".to_string()))?;
        workers
            .get(&storage.id)
            .cloned()
            .map(|w| w as Arc<dyn StorageWorker>)
            .ok_or_else(|| WorkerError::NoWorker(storage.id.clone()))
    }
}
