//! TimelineStore trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{Storage, Timeline};

/// Filter for [`TimelineStore::list_timelines`]. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineFilter {
    pub event_type: Option<String>,
    pub storage_id: Option<String>,
}

impl TimelineFilter {
    pub fn event_type(name: impl Into<String>) -> Self {
        Self {
            event_type: Some(name.into()),
            storage_id: None,
        }
    }

    pub fn storage(id: impl Into<String>) -> Self {
        Self {
            event_type: None,
            storage_id: Some(id.into()),
        }
    }

    pub fn matches(&self, timeline: &Timeline) -> bool {
        self.event_type
            .as_deref()
            .map_or(true, |name| timeline.event_type == name)
            && self
                .storage_id
                .as_deref()
                .map_or(true, |id| timeline.storage.id == id)
    }
}

/// Interface for storage and timeline persistence.
///
/// Implementations:
/// - `MockTimelineStore`: In-memory mock for testing
#[async_trait]
pub trait TimelineStore: Send + Sync {
    async fn list_storages(&self) -> Result<Vec<Storage>>;

    /// Returns `None` for unknown ids.
    async fn get_storage(&self, id: &str) -> Result<Option<Storage>>;

    /// The storage flagged as default, if one was configured.
    async fn get_default_storage(&self) -> Result<Option<Storage>>;

    async fn create_storage(&self, storage: &Storage) -> Result<()>;

    async fn update_storage(&self, storage: &Storage) -> Result<()>;

    async fn delete_storage(&self, id: &str) -> Result<()>;

    /// Timelines matching `filter`, ordered by event type then `order`.
    async fn list_timelines(&self, filter: &TimelineFilter) -> Result<Vec<Timeline>>;

    async fn get_timeline(&self, id: Uuid) -> Result<Option<Timeline>>;

    /// The switched timeline with the highest order for `event_type`.
    async fn load_active_timeline(&self, event_type: &str) -> Result<Option<Timeline>>;

    async fn create_timeline(&self, timeline: &Timeline) -> Result<()>;

    async fn update_timeline(&self, timeline: &Timeline) -> Result<()>;

    async fn delete_timeline(&self, id: Uuid) -> Result<()>;

    /// Persist a timeline switch as one unit: the superseded timeline with its
    /// final position stamped, and the new active timeline. On failure
    /// neither write is visible.
    ///
    /// Fails with `StoreError::Conflict` unless `superseded` is still the
    /// active timeline (or there is none when `superseded` is `None`) and no
    /// timeline of the event type already holds `next.order`.
    async fn commit_switch(&self, superseded: Option<&Timeline>, next: &Timeline) -> Result<()>;
}
