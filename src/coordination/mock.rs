//! In-memory ensemble for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{EnsembleConnector, EnsembleSession, SessionError, SessionId, SessionParams};

/// Lifecycle event observed by the mock ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Opened(SessionId),
    Closed(SessionId),
}

type EventLog = Arc<Mutex<Vec<SessionEvent>>>;

fn record(log: &EventLog, event: SessionEvent) {
    if let Ok(mut events) = log.lock() {
        events.push(event);
    }
}

/// Session handed out by [`MockEnsemble`].
#[derive(Debug)]
pub struct MockSession {
    id: SessionId,
    params: SessionParams,
    closed: AtomicBool,
    fail_probe: bool,
    log: EventLog,
}

#[async_trait]
impl EnsembleSession for MockSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn params(&self) -> &SessionParams {
        &self.params
    }

    async fn probe(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        if self.fail_probe {
            return Err(SessionError::Unusable(
                self.id,
                "mock probe failure".to_string(),
            ));
        }
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            record(&self.log, SessionEvent::Closed(self.id));
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Mock ensemble that opens in-memory sessions and records their lifecycle.
#[derive(Default)]
pub struct MockEnsemble {
    next_id: AtomicU64,
    open_attempts: AtomicU32,
    unreachable: AtomicBool,
    failing_opens: AtomicU32,
    failing_probes: AtomicU32,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    log: EventLog,
}

impl MockEnsemble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every open until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Fail the next `count` opens.
    pub fn fail_next_opens(&self, count: u32) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Hand out sessions whose probe fails for the next `count` opens.
    pub fn fail_next_probes(&self, count: u32) {
        self.failing_probes.store(count, Ordering::SeqCst);
    }

    pub fn open_attempts(&self) -> u32 {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Every session opened so far, in open order.
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.log
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions().iter().filter(|s| !s.is_closed()).count()
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl EnsembleConnector for MockEnsemble {
    async fn open(
        &self,
        params: &SessionParams,
    ) -> Result<Arc<dyn EnsembleSession>, SessionError> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);

        if self.unreachable.load(Ordering::SeqCst) || take_one(&self.failing_opens) {
            return Err(SessionError::Connect {
                connect_string: params.connect_string.clone(),
                message: "mock ensemble unreachable".to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Arc::new(MockSession {
            id,
            params: params.clone(),
            closed: AtomicBool::new(false),
            fail_probe: take_one(&self.failing_probes),
            log: self.log.clone(),
        });
        record(&self.log, SessionEvent::Opened(id));
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push(session.clone());
        }
        Ok(session)
    }
}
