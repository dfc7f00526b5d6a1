//! Errors surfaced by the storage registry and the timeline service.

use uuid::Uuid;

use crate::coordination::CoordinationError;
use crate::storage::StoreError;
use crate::sync::FenceError;
use crate::worker::WorkerError;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Broad class of a [`TimelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    NotFound,
    Configuration,
    Unavailable,
    Timeout,
    Internal,
}

/// One variant per rejected rule, so callers can tell which rule fired.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Unknown storage id in a request. Classified `NotFound`; callers that
    /// validate request input may treat it as an invalid argument instead.
    #[error("Storage with id {0} is not found")]
    StorageNotFound(String),

    #[error("Timeline with id {0} is not found")]
    TimelineNotFound(Uuid),

    #[error("Event type {0} is not found")]
    EventTypeNotFound(String),

    #[error("No default storage is configured")]
    NoDefaultStorage,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Can not change storage type for {0}")]
    StorageTypeChange(String),

    #[error("Timelines are present for storage {0}")]
    StorageInUse(String),

    #[error("The very first change should go to default storage, got {0}")]
    FirstTimelineNotOnDefault(String),

    #[error("Timeline event type: {actual}, provided: {provided}")]
    EventTypeMismatch { actual: String, provided: String },

    #[error("Can remove only the very first timeline")]
    NotFirstTimeline(Uuid),

    #[error("Timeline {0} is not the latest one")]
    NotLatestTimeline(Uuid),

    #[error("Timelines of {0} changed concurrently, retry the operation")]
    ConcurrentUpdate(String),

    #[error("Timeline update fence failed: {0}")]
    Fence(#[from] FenceError),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Storage worker error: {0}")]
    Worker(#[from] WorkerError),
}

impl From<StoreError> for TimelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EventTypeNotFound(name) => TimelineError::EventTypeNotFound(name),
            StoreError::Conflict(event_type) => TimelineError::ConcurrentUpdate(event_type),
            other => TimelineError::Store(other),
        }
    }
}

impl TimelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TimelineError::StorageNotFound(_)
            | TimelineError::TimelineNotFound(_)
            | TimelineError::EventTypeNotFound(_) => ErrorKind::NotFound,
            TimelineError::NoDefaultStorage | TimelineError::InvalidConfiguration(_) => {
                ErrorKind::Configuration
            }
            TimelineError::StorageTypeChange(_)
            | TimelineError::StorageInUse(_)
            | TimelineError::NotFirstTimeline(_)
            | TimelineError::NotLatestTimeline(_)
            | TimelineError::ConcurrentUpdate(_) => ErrorKind::InvalidState,
            TimelineError::FirstTimelineNotOnDefault(_)
            | TimelineError::EventTypeMismatch { .. } => ErrorKind::InvalidArgument,
            TimelineError::Fence(FenceError::Timeout { .. }) => ErrorKind::Timeout,
            TimelineError::Fence(_) => ErrorKind::Unavailable,
            TimelineError::Coordination(e) if e.is_configuration() => ErrorKind::Configuration,
            TimelineError::Coordination(_) => ErrorKind::Unavailable,
            TimelineError::Store(_) | TimelineError::Worker(_) => ErrorKind::Internal,
        }
    }
}
