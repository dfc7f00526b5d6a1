//! Timelines: the physical segments backing an event type over time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Storage;

/// Storage-specific layout of an event type on one storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeConfiguration {
    /// Topic (or equivalent) holding the event type's partitions.
    pub topic: String,
}

impl EventTypeConfiguration {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

/// Latest committed offset per partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub offsets: BTreeMap<String, u64>,
}

impl Position {
    pub fn new(offsets: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self {
            offsets: offsets.into_iter().collect(),
        }
    }
}

/// One physical segment of an event type.
///
/// Timelines of an event type are totally ordered by `order`, starting at 0.
/// The active one is the switched timeline with the highest order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: Uuid,
    pub event_type: String,
    pub order: u32,
    pub storage: Storage,
    pub configuration: EventTypeConfiguration,
    pub created_at: DateTime<Utc>,
    /// When the timeline became active.
    pub switched_at: Option<DateTime<Utc>>,
    /// Final position, stamped once a successor takes over.
    pub last_position: Option<Position>,
    /// Synthetic timeline describing pre-timeline layout; never persisted.
    #[serde(skip)]
    pub fake: bool,
}

impl Timeline {
    pub fn new(
        event_type: impl Into<String>,
        order: u32,
        storage: Storage,
        configuration: EventTypeConfiguration,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            order,
            storage,
            configuration,
            created_at,
            switched_at: None,
            last_position: None,
            fake: false,
        }
    }

    /// Synthetic timeline for an event type that has none persisted.
    pub fn fake(
        event_type: impl Into<String>,
        storage: Storage,
        configuration: EventTypeConfiguration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            event_type: event_type.into(),
            order: 0,
            storage,
            configuration,
            created_at: now,
            switched_at: Some(now),
            last_position: None,
            fake: true,
        }
    }

    pub fn is_first(&self) -> bool {
        self.order == 0
    }
}
