use serde::{Deserialize, Serialize};

/// A named, append-only stream of events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType {
    pub name: String,
}

impl EventType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
