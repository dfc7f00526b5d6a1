//! Versioned cursor references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cursor as handed out to consumers.
///
/// `V0` predates timelines and is implicitly bound to the default storage;
/// `V1` names its timeline explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum VersionedCursor {
    V0 {
        partition: String,
        offset: String,
    },
    V1 {
        partition: String,
        timeline_id: Uuid,
        offset: String,
    },
}

impl VersionedCursor {
    pub fn partition(&self) -> &str {
        match self {
            VersionedCursor::V0 { partition, .. } | VersionedCursor::V1 { partition, .. } => {
                partition
            }
        }
    }

    pub fn offset(&self) -> &str {
        match self {
            VersionedCursor::V0 { offset, .. } | VersionedCursor::V1 { offset, .. } => offset,
        }
    }
}
