//! Mock store implementations for testing.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventTypeRepository, Result, StoreError, TimelineFilter, TimelineStore};
use crate::model::{EventType, Storage, Timeline};

/// Mock timeline store that keeps storages and timelines in memory.
#[derive(Default)]
pub struct MockTimelineStore {
    storages: RwLock<BTreeMap<String, Storage>>,
    timelines: RwLock<HashMap<Uuid, Timeline>>,
    fail_on_switch: RwLock<bool>,
    fail_on_delete: RwLock<bool>,
}

impl MockTimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `storage` flagged as default.
    pub async fn with_default(storage: Storage) -> Self {
        let store = Self::new();
        let storage = storage.as_default();
        store
            .storages
            .write()
            .await
            .insert(storage.id.clone(), storage);
        store
    }

    pub async fn set_fail_on_switch(&self, fail: bool) {
        *self.fail_on_switch.write().await = fail;
    }

    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }

    pub async fn timeline_count(&self) -> usize {
        self.timelines.read().await.len()
    }
}

/// Whether another timeline of the same event type already has this order.
fn has_order(timelines: &HashMap<Uuid, Timeline>, timeline: &Timeline) -> bool {
    timelines.values().any(|t| {
        t.id != timeline.id && t.event_type == timeline.event_type && t.order == timeline.order
    })
}

#[async_trait]
impl TimelineStore for MockTimelineStore {
    async fn list_storages(&self) -> Result<Vec<Storage>> {
        Ok(self.storages.read().await.values().cloned().collect())
    }

    async fn get_storage(&self, id: &str) -> Result<Option<Storage>> {
        Ok(self.storages.read().await.get(id).cloned())
    }

    async fn get_default_storage(&self) -> Result<Option<Storage>> {
        Ok(self
            .storages
            .read()
            .await
            .values()
            .find(|s| s.default)
            .cloned())
    }

    async fn create_storage(&self, storage: &Storage) -> Result<()> {
        let mut storages = self.storages.write().await;
        if storages.contains_key(&storage.id) {
            return Err(StoreError::Duplicate(format!("storage {}", storage.id)));
        }
        storages.insert(storage.id.clone(), storage.clone());
        Ok(())
    }

    async fn update_storage(&self, storage: &Storage) -> Result<()> {
        let mut storages = self.storages.write().await;
        match storages.get_mut(&storage.id) {
            Some(existing) => {
                *existing = storage.clone();
                Ok(())
            }
            None => Err(StoreError::StorageNotFound(storage.id.clone())),
        }
    }

    async fn delete_storage(&self, id: &str) -> Result<()> {
        self.storages
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::StorageNotFound(id.to_string()))
    }

    async fn list_timelines(&self, filter: &TimelineFilter) -> Result<Vec<Timeline>> {
        let mut timelines: Vec<Timeline> = self
            .timelines
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        timelines.sort_by(|a, b| {
            a.event_type
                .cmp(&b.event_type)
                .then_with(|| a.order.cmp(&b.order))
        });
        Ok(timelines)
    }

    async fn get_timeline(&self, id: Uuid) -> Result<Option<Timeline>> {
        Ok(self.timelines.read().await.get(&id).cloned())
    }

    async fn load_active_timeline(&self, event_type: &str) -> Result<Option<Timeline>> {
        Ok(self
            .timelines
            .read()
            .await
            .values()
            .filter(|t| t.event_type == event_type && t.switched_at.is_some())
            .max_by_key(|t| t.order)
            .cloned())
    }

    async fn create_timeline(&self, timeline: &Timeline) -> Result<()> {
        let mut timelines = self.timelines.write().await;
        if timelines.contains_key(&timeline.id) {
            return Err(StoreError::Duplicate(format!("timeline {}", timeline.id)));
        }
        if has_order(&timelines, timeline) {
            return Err(StoreError::Duplicate(format!(
                "timeline {} order {}",
                timeline.event_type, timeline.order
            )));
        }
        timelines.insert(timeline.id, timeline.clone());
        Ok(())
    }

    async fn update_timeline(&self, timeline: &Timeline) -> Result<()> {
        let mut timelines = self.timelines.write().await;
        match timelines.get_mut(&timeline.id) {
            Some(existing) => {
                *existing = timeline.clone();
                Ok(())
            }
            None => Err(StoreError::TimelineNotFound(timeline.id)),
        }
    }

    async fn delete_timeline(&self, id: Uuid) -> Result<()> {
        if *self.fail_on_delete.read().await {
            return Err(StoreError::Database("mock delete failure".to_string()));
        }
        self.timelines
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::TimelineNotFound(id))
    }

    async fn commit_switch(&self, superseded: Option<&Timeline>, next: &Timeline) -> Result<()> {
        if *self.fail_on_switch.read().await {
            return Err(StoreError::Database("mock switch failure".to_string()));
        }

        let mut timelines = self.timelines.write().await;
        if let Some(previous) = superseded {
            if !timelines.contains_key(&previous.id) {
                return Err(StoreError::TimelineNotFound(previous.id));
            }
        }
        if timelines.contains_key(&next.id) {
            return Err(StoreError::Duplicate(format!("timeline {}", next.id)));
        }

        let active = timelines
            .values()
            .filter(|t| t.event_type == next.event_type && t.switched_at.is_some())
            .max_by_key(|t| t.order)
            .map(|t| t.id);
        if active != superseded.map(|t| t.id) || has_order(&timelines, next) {
            return Err(StoreError::Conflict(next.event_type.clone()));
        }

        if let Some(previous) = superseded {
            timelines.insert(previous.id, previous.clone());
        }
        timelines.insert(next.id, next.clone());
        Ok(())
    }
}

/// Mock event-type repository.
#[derive(Default)]
pub struct MockEventTypeRepository {
    event_types: RwLock<HashMap<String, EventType>>,
}

impl MockEventTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, event_type: EventType) {
        self.event_types
            .write()
            .await
            .insert(event_type.name.clone(), event_type);
    }
}

#[async_trait]
impl EventTypeRepository for MockEventTypeRepository {
    async fn find_by_name(&self, name: &str) -> Result<EventType> {
        self.event_types
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::EventTypeNotFound(name.to_string()))
    }
}
