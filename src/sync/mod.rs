//! Cluster-wide pause/resume of publishing per event type.
//!
//! A timeline update fences every producer of one event type:
//! `start_timeline_update` returns once all producers have suspended publishing
//! (or fails after its timeout, leaving nothing fenced), and
//! `finish_timeline_update` lets them resume. Updates for the same event type
//! are mutually exclusive; different event types are independent.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

mod local;
pub mod mock;

pub use local::{LocalTimelineSync, PublishPermit};
pub use mock::{FenceCall, MockTimelineSync};

/// Result type for fence operations.
pub type Result<T> = std::result::Result<T, FenceError>;

/// Errors raised by the pause/resume primitive.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FenceError {
    #[error("Timed out after {timeout:?} waiting for producers of {event_type} to pause")]
    Timeout {
        event_type: String,
        timeout: Duration,
    },

    #[error("Timeline sync unavailable: {0}")]
    Unavailable(String),

    #[error("No timeline update in progress for {0}")]
    NotHeld(String),
}

/// Pause/resume primitive fencing producers of an event type.
#[async_trait]
pub trait TimelineSync: Send + Sync {
    /// Block until every producer of `event_type` has paused, or fail after
    /// `timeout` with nothing left fenced.
    async fn start_timeline_update(&self, event_type: &str, timeout: Duration) -> Result<()>;

    /// Release the fence taken by `start_timeline_update`.
    async fn finish_timeline_update(&self, event_type: &str) -> Result<()>;
}

/// Releases the fence exactly once.
///
/// The release always runs on a spawned task, so dropping the future that
/// holds the guard (before or during the release) cannot skip it.
struct FenceGuard {
    sync: Arc<dyn TimelineSync>,
    event_type: String,
    armed: bool,
}

impl FenceGuard {
    fn new(sync: Arc<dyn TimelineSync>, event_type: &str) -> Self {
        Self {
            sync,
            event_type: event_type.to_string(),
            armed: true,
        }
    }

    fn spawn_release(&mut self) -> Option<JoinHandle<()>> {
        self.armed = false;
        let sync = self.sync.clone();
        let event_type = std::mem::take(&mut self.event_type);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(async move {
                finish(sync.as_ref(), &event_type).await;
            })),
            Err(_) => {
                error!(event_type = %event_type, "Fence abandoned outside a runtime, cannot release");
                None
            }
        }
    }

    /// Release and wait for it; the release still completes if this wait is
    /// cancelled.
    async fn release(mut self) {
        if let Some(release) = self.spawn_release() {
            if let Err(e) = release.await {
                error!(error = %e, "Fence release task failed");
            }
        }
    }
}

impl Drop for FenceGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(event_type = %self.event_type, "Fenced block abandoned, releasing in background");
            let _ = self.spawn_release();
        }
    }
}

async fn finish(sync: &dyn TimelineSync, event_type: &str) {
    match sync.finish_timeline_update(event_type).await {
        Ok(()) => debug!(event_type = %event_type, "Timeline update finished"),
        Err(e) => error!(event_type = %event_type, error = %e, "Failed to finish timeline update"),
    }
}

/// Run `body` with producers of `event_type` fenced.
///
/// The fence is released whether `body` returns, fails or panics; the outcome
/// of `body` is reported only after the release.
pub async fn with_fence<T, E, F>(
    sync: &Arc<dyn TimelineSync>,
    event_type: &str,
    timeout: Duration,
    body: F,
) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: From<FenceError>,
{
    sync.start_timeline_update(event_type, timeout).await?;
    debug!(event_type = %event_type, "Producers fenced");
    let guard = FenceGuard::new(sync.clone(), event_type);

    let outcome = AssertUnwindSafe(body).catch_unwind().await;
    guard.release().await;

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
