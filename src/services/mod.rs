//! Timeline management services.
//!
//! This module contains:
//! - `StorageRegistry`: storage CRUD guarded against type changes and in-use
//!   deletion
//! - `TimelineService`: timeline creation, fenced migration, deletion and
//!   cursor resolution
//! - `TimelineError`: the error every rejected rule surfaces as

mod error;
mod storage_registry;
mod timeline_service;

pub use error::{ErrorKind, Result, TimelineError};
pub use storage_registry::StorageRegistry;
pub use timeline_service::{TimelineService, TIMELINE_UPDATE_TIMEOUT};
