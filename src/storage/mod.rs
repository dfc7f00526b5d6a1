//! Persistence collaborators.
//!
//! This module contains:
//! - `TimelineStore` trait: storage and timeline records
//! - `EventTypeRepository` trait: event-type metadata lookup
//! - Implementations: Mock

pub mod mock;

mod event_type_repository;
mod timeline_store;

pub use event_type_repository::EventTypeRepository;
pub use mock::{MockEventTypeRepository, MockTimelineStore};
pub use timeline_store::{TimelineFilter, TimelineStore};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Event type not found: {0}")]
    EventTypeNotFound(String),

    #[error("Storage not found: {0}")]
    StorageNotFound(String),

    #[error("Timeline not found: {0}")]
    TimelineNotFound(uuid::Uuid),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A timeline switch raced another update of the same event type.
    #[error("Conflicting timeline update for event type {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}
