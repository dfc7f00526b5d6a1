//! In-process timeline sync for single-node deployments.
//!
//! Publishers hold a shared permit per event type while they write; a timeline
//! update takes the exclusive side, so `start_timeline_update` returns only once
//! no publish is in flight and new publishes queue behind it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info};

use super::{FenceError, Result, TimelineSync};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Permission to publish to one event type; publishing is blocked while any
/// permit is outstanding for a timeline update.
#[derive(Debug)]
pub struct PublishPermit {
    _guard: OwnedRwLockReadGuard<()>,
}

/// Pause/resume primitive backed by per-event-type read/write locks.
///
/// A lock is dropped from the registry once an update finishes or times out
/// with nobody else holding or waiting on it; event types that are only ever
/// published to keep theirs, one per event type.
pub struct LocalTimelineSync {
    fences: Mutex<HashMap<String, Arc<RwLock<()>>>>,
    held: Mutex<HashMap<String, OwnedRwLockWriteGuard<()>>>,
    changes: broadcast::Sender<String>,
}

impl Default for LocalTimelineSync {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTimelineSync {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            fences: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn fence(&self, event_type: &str) -> Result<Arc<RwLock<()>>> {
        let mut fences = self
            .fences
            .lock()
            .map_err(|_| FenceError::Unavailable("fence registry poisoned".to_string()))?;
        Ok(fences
            .entry(event_type.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone())
    }

    /// Forget the lock for `event_type` if nothing references it any more.
    fn prune(&self, event_type: &str) {
        if let Ok(mut fences) = self.fences.lock() {
            if fences
                .get(event_type)
                .is_some_and(|fence| Arc::strong_count(fence) == 1)
            {
                fences.remove(event_type);
            }
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.fences.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Wait up to `timeout` for permission to publish to `event_type`.
    pub async fn publish_permit(&self, event_type: &str, timeout: Duration) -> Result<PublishPermit> {
        let fence = self.fence(event_type)?;
        let guard = tokio::time::timeout(timeout, fence.read_owned())
            .await
            .map_err(|_| FenceError::Timeout {
                event_type: event_type.to_string(),
                timeout,
            })?;
        Ok(PublishPermit { _guard: guard })
    }

    /// Receive the name of every event type whose timeline update finished.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    /// Whether a timeline update currently fences `event_type`.
    pub fn is_fenced(&self, event_type: &str) -> bool {
        self.held
            .lock()
            .map(|held| held.contains_key(event_type))
            .unwrap_or(false)
    }
}

#[async_trait]
impl TimelineSync for LocalTimelineSync {
    async fn start_timeline_update(&self, event_type: &str, timeout: Duration) -> Result<()> {
        let fence = self.fence(event_type)?;
        let acquired = tokio::time::timeout(timeout, fence.write_owned()).await;
        let guard = match acquired {
            Ok(guard) => guard,
            Err(_) => {
                self.prune(event_type);
                return Err(FenceError::Timeout {
                    event_type: event_type.to_string(),
                    timeout,
                });
            }
        };

        self.held
            .lock()
            .map_err(|_| FenceError::Unavailable("fence registry poisoned".to_string()))?
            .insert(event_type.to_string(), guard);
        info!(event_type = %event_type, "Publishing paused for timeline update");
        Ok(())
    }

    async fn finish_timeline_update(&self, event_type: &str) -> Result<()> {
        let guard = self
            .held
            .lock()
            .map_err(|_| FenceError::Unavailable("fence registry poisoned".to_string()))?
            .remove(event_type)
            .ok_or_else(|| FenceError::NotHeld(event_type.to_string()))?;
        drop(guard);
        self.prune(event_type);

        if self.changes.send(event_type.to_string()).is_err() {
            debug!(event_type = %event_type, "No timeline change listeners");
        }
        info!(event_type = %event_type, "Publishing resumed after timeline update");
        Ok(())
    }
}
