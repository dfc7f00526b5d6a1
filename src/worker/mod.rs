//! Storage workers: per-storage adapters that materialize event types on a
//! physical backend.
//!
//! This module contains:
//! - `StorageWorker` trait: topic configuration, synthetic timelines, positions
//! - `TopicRepository` trait: partition listing
//! - `StorageWorkerFactory` trait: worker lookup keyed by storage
//! - Implementations: Mock

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{EventType, EventTypeConfiguration, Position, Storage, Timeline};

pub mod mock;

pub use mock::{MockStorageWorker, MockWorkerFactory};

/// Result type for storage worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors raised by storage workers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("No worker for storage {0}")]
    NoWorker(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Partition-level view of a storage.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn list_partition_names(&self, configuration: &EventTypeConfiguration)
        -> Result<Vec<String>>;
}

/// Adapter for one physical storage.
#[async_trait]
pub trait StorageWorker: Send + Sync {
    fn storage(&self) -> &Storage;

    fn topic_repository(&self) -> &dyn TopicRepository;

    /// Create the physical layout for `event_type` on this storage.
    ///
    /// `partitions` carries the predecessor's partition count, if any.
    /// `first_timeline` is true when no persisted predecessor exists and the
    /// existing default-storage layout is being adopted.
    async fn create_event_type_configuration(
        &self,
        event_type: &EventType,
        partitions: Option<usize>,
        first_timeline: bool,
    ) -> Result<EventTypeConfiguration>;

    /// Unpersisted timeline describing the event type's current layout here.
    async fn create_fake_timeline(&self, event_type: &EventType) -> Result<Timeline>;

    /// Latest committed position of `timeline`.
    async fn latest_position(&self, timeline: &Timeline) -> Result<Position>;
}

/// Resolves the worker responsible for a storage.
pub trait StorageWorkerFactory: Send + Sync {
    fn worker(&self, storage: &Storage) -> Result<Arc<dyn StorageWorker>>;
}
