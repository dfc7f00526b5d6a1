use async_trait::async_trait;

use super::Result;
use crate::model::EventType;

/// Event-type metadata lookup.
#[async_trait]
pub trait EventTypeRepository: Send + Sync {
    /// Fails with `StoreError::EventTypeNotFound` for unknown names.
    async fn find_by_name(&self, name: &str) -> Result<EventType>;
}
