//! Application configuration.
//!
//! Aggregates coordination, timeline and default-storage settings into a
//! single Config struct that can be loaded from YAML files or environment
//! variables.

use std::time::Duration;

use serde::Deserialize;

use crate::coordination::{CoordinationError, EnsembleConnection, SessionSettings};
use crate::model::{Storage, StorageType};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "TIDELINE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "TIDELINE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "TIDELINE_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordination ensemble configuration.
    pub coordination: CoordinationConfig,
    /// Timeline settings.
    pub timelines: TimelinesConfig,
    /// Default storage created at startup when the store has none.
    pub default_storage: Option<DefaultStorageConfig>,
}

/// Coordination ensemble configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Connection string, e.g. `zookeeper://zk1:2181,zk2:2181/tideline`.
    pub ensemble: String,
    /// Session timeout for primary and lock sessions.
    pub session_timeout_ms: u64,
    /// Connection timeout for every session.
    pub connection_timeout_ms: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            ensemble: "zookeeper://localhost:2181".to_string(),
            session_timeout_ms: 10_000,
            connection_timeout_ms: 3_000,
        }
    }
}

impl CoordinationConfig {
    pub fn connection(&self) -> Result<EnsembleConnection, CoordinationError> {
        self.ensemble.parse()
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

/// Timeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelinesConfig {
    /// Maximum subscription commit timeout; sessions requested with exactly
    /// this timeout share one long-lived session.
    pub max_commit_timeout_secs: u64,
}

impl Default for TimelinesConfig {
    fn default() -> Self {
        Self {
            max_commit_timeout_secs: 60,
        }
    }
}

impl TimelinesConfig {
    pub fn max_commit_timeout(&self) -> Duration {
        Duration::from_secs(self.max_commit_timeout_secs)
    }
}

/// Default storage definition.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultStorageConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Ensemble connection of the Kafka cluster (Kafka storages only).
    #[serde(default)]
    pub zookeeper: Option<String>,
}

impl DefaultStorageConfig {
    /// Build the storage this definition describes, flagged as default.
    pub fn to_storage(&self) -> Result<Storage, ConfigError> {
        let storage = match self.storage_type {
            StorageType::Kafka => {
                let zookeeper = self.zookeeper.as_deref().ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "kafka storage {} requires a zookeeper connection",
                        self.id
                    ))
                })?;
                Storage::kafka(self.id.clone(), zookeeper.parse()?)
            }
            StorageType::InMemory => Storage::in_memory(self.id.clone()),
        };
        Ok(storage.as_default())
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Timeouts for the session manager. The connection timeout belongs to
    /// the session factory, see [`CoordinationConfig::connection_timeout`].
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            session_timeout: self.coordination.session_timeout(),
            max_commit_timeout: self.timelines.max_commit_timeout(),
        }
    }
}
