//! Physical storage backend definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordination::EnsembleConnection;

/// Kind of physical backend. Immutable once a storage is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Kafka,
    InMemory,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Kafka => f.write_str("kafka"),
            StorageType::InMemory => f.write_str("in_memory"),
        }
    }
}

/// Kafka cluster reached through its coordination ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaConfiguration {
    pub zookeeper: EnsembleConnection,
}

/// Type-specific connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfiguration {
    Kafka(KafkaConfiguration),
    InMemory,
}

impl StorageConfiguration {
    pub fn storage_type(&self) -> StorageType {
        match self {
            StorageConfiguration::Kafka(_) => StorageType::Kafka,
            StorageConfiguration::InMemory => StorageType::InMemory,
        }
    }
}

/// A physical backend that timelines are stored on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub id: String,
    pub configuration: StorageConfiguration,
    /// Whether this is the storage new event types start on.
    #[serde(default)]
    pub default: bool,
}

impl Storage {
    pub fn new(id: impl Into<String>, configuration: StorageConfiguration) -> Self {
        Self {
            id: id.into(),
            configuration,
            default: false,
        }
    }

    pub fn kafka(id: impl Into<String>, zookeeper: EnsembleConnection) -> Self {
        Self::new(id, StorageConfiguration::Kafka(KafkaConfiguration { zookeeper }))
    }

    pub fn in_memory(id: impl Into<String>) -> Self {
        Self::new(id, StorageConfiguration::InMemory)
    }

    /// Mark this storage as the default one.
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn storage_type(&self) -> StorageType {
        self.configuration.storage_type()
    }
}
