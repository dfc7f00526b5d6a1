//! Domain model: storages, timelines, event types and versioned cursors.

mod cursor;
mod event_type;
mod storage;
mod timeline;

pub use cursor::VersionedCursor;
pub use event_type::EventType;
pub use storage::{KafkaConfiguration, Storage, StorageConfiguration, StorageType};
pub use timeline::{EventTypeConfiguration, Position, Timeline};
