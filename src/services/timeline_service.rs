//! Timeline migration coordinator.
//!
//! Moves an event type from its active timeline onto a new one, possibly on
//! another storage. The switch runs with every producer of the event type
//! fenced, so no event is published while the predecessor's final position
//! is recorded and the successor becomes active.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Result, StorageRegistry, TimelineError};
use crate::model::{EventType, Timeline, VersionedCursor};
use crate::storage::{EventTypeRepository, TimelineFilter, TimelineStore};
use crate::sync::{with_fence, TimelineSync};
use crate::worker::{StorageWorker, StorageWorkerFactory};

/// Budget for fencing producers of an event type.
pub const TIMELINE_UPDATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates, switches, deletes and resolves timelines.
pub struct TimelineService {
    store: Arc<dyn TimelineStore>,
    event_types: Arc<dyn EventTypeRepository>,
    workers: Arc<dyn StorageWorkerFactory>,
    sync: Arc<dyn TimelineSync>,
    storages: StorageRegistry,
}

impl TimelineService {
    pub fn new(
        store: Arc<dyn TimelineStore>,
        event_types: Arc<dyn EventTypeRepository>,
        workers: Arc<dyn StorageWorkerFactory>,
        sync: Arc<dyn TimelineSync>,
    ) -> Self {
        Self {
            storages: StorageRegistry::new(store.clone()),
            store,
            event_types,
            workers,
            sync,
        }
    }

    pub fn storages(&self) -> &StorageRegistry {
        &self.storages
    }

    async fn default_worker(&self) -> Result<Arc<dyn StorageWorker>> {
        let storage = self.storages.default_storage().await?;
        Ok(self.workers.worker(&storage)?)
    }

    /// Persisted timelines of `event_type`, ordered by `order`.
    pub async fn list_timelines(&self, event_type: &str) -> Result<Vec<Timeline>> {
        Ok(self
            .store
            .list_timelines(&TimelineFilter::event_type(event_type))
            .await?)
    }

    /// First timeline of a freshly defined event type, on the default storage.
    ///
    /// No producers exist yet, so nothing is fenced.
    pub async fn create_timeline_for_new_event_type(
        &self,
        event_type: &EventType,
    ) -> Result<Timeline> {
        let worker = self.default_worker().await?;
        let configuration = worker
            .create_event_type_configuration(event_type, None, false)
            .await?;

        let mut timeline = Timeline::new(
            event_type.name.clone(),
            0,
            worker.storage().clone(),
            configuration,
            Utc::now(),
        );
        timeline.switched_at = Some(timeline.created_at);
        self.store.create_timeline(&timeline).await?;

        info!(
            event_type = %event_type.name,
            timeline_id = %timeline.id,
            storage_id = %timeline.storage.id,
            "Created first timeline for new event type"
        );
        Ok(timeline)
    }

    /// Switch `event_type_name` onto a new timeline on `storage_id`.
    ///
    /// An event type without an active timeline may only start its first
    /// timeline on the default storage. Producers are fenced for the switch
    /// and released however it ends; on failure the previous timeline stays
    /// active.
    pub async fn create_and_start_timeline(
        &self,
        event_type_name: &str,
        storage_id: &str,
    ) -> Result<Timeline> {
        let storage = self
            .storages
            .get(storage_id)
            .await?
            .ok_or_else(|| TimelineError::StorageNotFound(storage_id.to_string()))?;
        let event_type = self.event_types.find_by_name(event_type_name).await?;
        let active = self.store.load_active_timeline(event_type_name).await?;

        let old_storage = match &active {
            Some(timeline) => timeline.storage.clone(),
            None => self.storages.default_storage().await?,
        };
        let old_worker = self.workers.worker(&old_storage)?;
        let new_worker = self.workers.worker(&storage)?;

        let mut timeline = match &active {
            None => {
                if storage.id != old_storage.id {
                    return Err(TimelineError::FirstTimelineNotOnDefault(storage.id));
                }
                let fake = old_worker.create_fake_timeline(&event_type).await?;
                let partitions = old_worker
                    .topic_repository()
                    .list_partition_names(&fake.configuration)
                    .await?
                    .len();
                let configuration = new_worker
                    .create_event_type_configuration(&event_type, Some(partitions), true)
                    .await?;
                Timeline::new(event_type_name, 0, storage, configuration, Utc::now())
            }
            Some(current) => {
                let partitions = old_worker
                    .topic_repository()
                    .list_partition_names(&current.configuration)
                    .await?
                    .len();
                let configuration = new_worker
                    .create_event_type_configuration(&event_type, Some(partitions), false)
                    .await?;
                Timeline::new(
                    event_type_name,
                    current.order + 1,
                    storage,
                    configuration,
                    Utc::now(),
                )
            }
        };

        debug!(
            event_type = %event_type_name,
            order = timeline.order,
            storage_id = %timeline.storage.id,
            "Switching timeline"
        );

        let expected = active.as_ref().map(|t| t.id);
        with_fence(&self.sync, event_type_name, TIMELINE_UPDATE_TIMEOUT, async {
            // The fence serializes updates; whatever was read before it may be stale.
            self.ensure_active(event_type_name, expected).await?;
            timeline.switched_at = Some(Utc::now());
            let superseded = match active {
                Some(mut previous) => {
                    previous.last_position = Some(old_worker.latest_position(&previous).await?);
                    Some(previous)
                }
                None => None,
            };
            self.store
                .commit_switch(superseded.as_ref(), &timeline)
                .await?;
            Ok::<_, TimelineError>(())
        })
        .await?;

        info!(
            event_type = %event_type_name,
            timeline_id = %timeline.id,
            order = timeline.order,
            storage_id = %timeline.storage.id,
            "Timeline switched"
        );
        Ok(timeline)
    }

    /// Delete the first timeline of `event_type`, returning the event type to
    /// its pre-timeline layout.
    ///
    /// Only the active timeline with order 0 can be deleted.
    pub async fn delete_timeline(&self, event_type: &str, timeline_id: Uuid) -> Result<()> {
        let timeline = self
            .store
            .get_timeline(timeline_id)
            .await?
            .ok_or(TimelineError::TimelineNotFound(timeline_id))?;
        if timeline.event_type != event_type {
            return Err(TimelineError::EventTypeMismatch {
                actual: timeline.event_type,
                provided: event_type.to_string(),
            });
        }
        if !timeline.is_first() {
            return Err(TimelineError::NotFirstTimeline(timeline_id));
        }
        let active = self.store.load_active_timeline(event_type).await?;
        if active.map(|t| t.id) != Some(timeline.id) {
            return Err(TimelineError::NotLatestTimeline(timeline_id));
        }

        with_fence(&self.sync, event_type, TIMELINE_UPDATE_TIMEOUT, async {
            let current = self.store.load_active_timeline(event_type).await?;
            if current.map(|t| t.id) != Some(timeline.id) {
                return Err(TimelineError::NotLatestTimeline(timeline_id));
            }
            self.store.delete_timeline(timeline.id).await?;
            Ok::<_, TimelineError>(())
        })
        .await?;

        info!(event_type = %event_type, timeline_id = %timeline_id, "Timeline deleted");
        Ok(())
    }

    /// Fail unless the active timeline of `event_type` is still `expected`.
    async fn ensure_active(&self, event_type: &str, expected: Option<Uuid>) -> Result<()> {
        let current = self
            .store
            .load_active_timeline(event_type)
            .await?
            .map(|t| t.id);
        if current != expected {
            warn!(
                event_type = %event_type,
                expected = ?expected,
                current = ?current,
                "Active timeline changed while waiting for the fence"
            );
            return Err(TimelineError::ConcurrentUpdate(event_type.to_string()));
        }
        Ok(())
    }

    /// Active timeline of `event_type`, or a synthetic one describing its
    /// layout on the default storage when none is persisted.
    pub async fn get_timeline(&self, event_type: &EventType) -> Result<Timeline> {
        if let Some(active) = self.store.load_active_timeline(&event_type.name).await? {
            return Ok(active);
        }
        self.fake_timeline(event_type).await
    }

    /// Timeline a consumer cursor points into.
    pub async fn resolve_timeline(
        &self,
        event_type: &EventType,
        cursor: &VersionedCursor,
    ) -> Result<Timeline> {
        match cursor {
            VersionedCursor::V0 { .. } => self.fake_timeline(event_type).await,
            VersionedCursor::V1 { timeline_id, .. } => self
                .store
                .get_timeline(*timeline_id)
                .await?
                .ok_or(TimelineError::TimelineNotFound(*timeline_id)),
        }
    }

    async fn fake_timeline(&self, event_type: &EventType) -> Result<Timeline> {
        let worker = self.default_worker().await?;
        Ok(worker.create_fake_timeline(event_type).await?)
    }
}
