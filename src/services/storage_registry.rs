//! Storage registry.
//!
//! CRUD over storages with two guards: a storage's type never changes, and a
//! storage referenced by any timeline is neither updated nor deleted.

use std::sync::Arc;

use tracing::{debug, info};

use super::{Result, TimelineError};
use crate::config::Config;
use crate::model::Storage;
use crate::storage::{TimelineFilter, TimelineStore};

/// Registry of physical storages.
pub struct StorageRegistry {
    store: Arc<dyn TimelineStore>,
}

impl StorageRegistry {
    pub fn new(store: Arc<dyn TimelineStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Storage>> {
        Ok(self.store.list_storages().await?)
    }

    /// Storage by id; `None` when absent.
    pub async fn get(&self, id: &str) -> Result<Option<Storage>> {
        Ok(self.store.get_storage(id).await?)
    }

    /// The configured default storage.
    ///
    /// A deployment without one is misconfigured.
    pub async fn default_storage(&self) -> Result<Storage> {
        self.store
            .get_default_storage()
            .await?
            .ok_or(TimelineError::NoDefaultStorage)
    }

    /// Create `storage`, or update it in place.
    ///
    /// Updates are rejected when the type would change or when timelines are
    /// stored on it.
    pub async fn create_or_update(&self, storage: Storage) -> Result<Storage> {
        match self.store.get_storage(&storage.id).await? {
            Some(existing) => {
                if existing.storage_type() != storage.storage_type() {
                    return Err(TimelineError::StorageTypeChange(storage.id));
                }
                self.ensure_unreferenced(&storage.id).await?;
                self.store.update_storage(&storage).await?;
                info!(storage_id = %storage.id, "Storage updated");
            }
            None => {
                self.store.create_storage(&storage).await?;
                info!(
                    storage_id = %storage.id,
                    storage_type = %storage.storage_type(),
                    "Storage created"
                );
            }
        }
        Ok(storage)
    }

    /// Delete a storage. Absent ids are ignored.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.store.get_storage(id).await?.is_none() {
            debug!(storage_id = %id, "Storage already absent");
            return Ok(());
        }
        self.ensure_unreferenced(id).await?;
        self.store.delete_storage(id).await?;
        info!(storage_id = %id, "Storage deleted");
        Ok(())
    }

    /// Make sure a default storage exists, creating it from `config` if needed.
    pub async fn ensure_default_storage(&self, config: &Config) -> Result<Storage> {
        if let Some(storage) = self.store.get_default_storage().await? {
            return Ok(storage);
        }

        let definition = config
            .default_storage
            .as_ref()
            .ok_or(TimelineError::NoDefaultStorage)?;
        let storage = definition
            .to_storage()
            .map_err(|e| TimelineError::InvalidConfiguration(e.to_string()))?;
        let storage = self.create_or_update(storage).await?;
        info!(storage_id = %storage.id, "Default storage bootstrapped from configuration");
        Ok(storage)
    }

    async fn ensure_unreferenced(&self, id: &str) -> Result<()> {
        let timelines = self
            .store
            .list_timelines(&TimelineFilter::storage(id))
            .await?;
        if timelines.is_empty() {
            Ok(())
        } else {
            Err(TimelineError::StorageInUse(id.to_string()))
        }
    }
}
