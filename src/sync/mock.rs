//! Mock timeline sync for testing.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{FenceError, Result, TimelineSync};

/// A call observed by [`MockTimelineSync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceCall {
    Start {
        event_type: String,
        timeout: Duration,
    },
    Finish {
        event_type: String,
    },
}

/// Mock sync that records every start/finish call.
#[derive(Default)]
pub struct MockTimelineSync {
    calls: RwLock<Vec<FenceCall>>,
    fail_on_start: RwLock<Option<FenceError>>,
    fail_on_finish: RwLock<bool>,
}

impl MockTimelineSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent starts fail with `error`.
    pub async fn set_fail_on_start(&self, error: Option<FenceError>) {
        *self.fail_on_start.write().await = error;
    }

    pub async fn set_fail_on_finish(&self, fail: bool) {
        *self.fail_on_finish.write().await = fail;
    }

    pub async fn calls(&self) -> Vec<FenceCall> {
        self.calls.read().await.clone()
    }

    /// Number of starts not yet matched by a finish.
    pub async fn outstanding(&self) -> usize {
        let calls = self.calls.read().await;
        let starts = calls
            .iter()
            .filter(|c| matches!(c, FenceCall::Start { .. }))
            .count();
        let finishes = calls.len() - starts;
        starts.saturating_sub(finishes)
    }
}

#[async_trait]
impl TimelineSync for MockTimelineSync {
    async fn start_timeline_update(&self, event_type: &str, timeout: Duration) -> Result<()> {
        if let Some(error) = self.fail_on_start.read().await.clone() {
            return Err(error);
        }
        self.calls.write().await.push(FenceCall::Start {
            event_type: event_type.to_string(),
            timeout,
        });
        Ok(())
    }

    async fn finish_timeline_update(&self, event_type: &str) -> Result<()> {
        self.calls.write().await.push(FenceCall::Finish {
            event_type: event_type.to_string(),
        });
        if *self.fail_on_finish.read().await {
            return Err(FenceError::Unavailable("mock finish failure".to_string()));
        }
        Ok(())
    }
}
