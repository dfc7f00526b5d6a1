//! Session lifecycle manager.
//!
//! Owns the three kinds of ensemble session a process keeps:
//!
//! - **primary**: opened at construction, lives for the process lifetime.
//! - **lock**: shared, but replaced once it is older than
//!   [`LOCK_SESSION_LIVE_PERIOD`]. Under some connection-loss conditions the
//!   ensemble client does not release acquired leases; destroying the whole
//!   session is the only way to drop them.
//! - **subscription**: one shared session for the default commit timeout,
//!   or a disposable caller-owned session for any other timeout.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{EnsembleSession, Result, SessionFactory, SessionKind};

/// Age after which the lock session is replaced.
pub const LOCK_SESSION_LIVE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Timeouts applied to managed sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Session timeout for primary and lock sessions.
    pub session_timeout: Duration,
    /// Default maximum commit timeout; the shared subscription session uses it
    /// as its session timeout.
    pub max_commit_timeout: Duration,
}

/// Whether closing a [`ScopedSession`] tears the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOwnership {
    /// Process-wide session; closing the handle is a no-op.
    Shared,
    /// Caller-owned session; closing the handle closes the session.
    Owned,
}

/// Subscription session handle.
///
/// Owned handles close their session when closed or dropped, so a disposable
/// session is released on every exit path.
#[derive(Debug)]
pub struct ScopedSession {
    session: Arc<dyn EnsembleSession>,
    ownership: SessionOwnership,
}

impl ScopedSession {
    fn shared(session: Arc<dyn EnsembleSession>) -> Self {
        Self {
            session,
            ownership: SessionOwnership::Shared,
        }
    }

    fn owned(session: Arc<dyn EnsembleSession>) -> Self {
        Self {
            session,
            ownership: SessionOwnership::Owned,
        }
    }

    pub fn ownership(&self) -> SessionOwnership {
        self.ownership
    }

    pub fn session(&self) -> &Arc<dyn EnsembleSession> {
        &self.session
    }

    /// Release the handle.
    pub fn close(self) {
        drop(self);
    }
}

impl Deref for ScopedSession {
    type Target = dyn EnsembleSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if self.ownership == SessionOwnership::Owned {
            debug!(session_id = self.session.id(), "Closing disposable session");
            self.session.close();
        }
    }
}

struct LockSlot {
    session: Arc<dyn EnsembleSession>,
    created_at: Instant,
}

/// Process-wide owner of ensemble sessions.
pub struct SessionManager {
    factory: SessionFactory,
    settings: SessionSettings,
    primary: Arc<dyn EnsembleSession>,
    subscription: Arc<dyn EnsembleSession>,
    lock: Mutex<Option<LockSlot>>,
}

impl SessionManager {
    /// Open the primary and shared subscription sessions.
    ///
    /// Failure here is fatal for the process.
    pub async fn connect(factory: SessionFactory, settings: SessionSettings) -> Result<Self> {
        let primary = factory
            .create(SessionKind::Primary, settings.session_timeout)
            .await?;
        let subscription = match factory
            .create(SessionKind::Subscription, settings.max_commit_timeout)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                primary.close();
                return Err(e);
            }
        };

        info!(
            primary = primary.id(),
            subscription = subscription.id(),
            "Session manager connected"
        );

        Ok(Self {
            factory,
            settings,
            primary,
            subscription,
            lock: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// The process-lifetime session. Callers must not close it.
    pub fn primary(&self) -> Arc<dyn EnsembleSession> {
        self.primary.clone()
    }

    /// Current lock session, replaced first if it outlived its live period.
    ///
    /// The replacement is opened and probed before the old session is closed.
    /// If the replacement cannot be created the error is returned and the
    /// old session stays in the slot. Concurrent callers are serialized, so
    /// only one of them performs the swap.
    pub async fn lock_session(&self) -> Result<Arc<dyn EnsembleSession>> {
        let mut slot = self.lock.lock().await;

        if let Some(current) = slot.as_ref() {
            if current.created_at.elapsed() <= LOCK_SESSION_LIVE_PERIOD {
                return Ok(current.session.clone());
            }
        }

        let fresh = self
            .factory
            .create(SessionKind::Lock, self.settings.session_timeout)
            .await
            .inspect_err(|e| {
                warn!(error = %e, "Failed to replace lock session, keeping the current one");
            })?;

        let previous = slot.replace(LockSlot {
            session: fresh.clone(),
            created_at: Instant::now(),
        });
        if let Some(previous) = previous {
            info!(
                old_session = previous.session.id(),
                new_session = fresh.id(),
                "Rotated lock session"
            );
            previous.session.close();
        }

        Ok(fresh)
    }

    /// Session for subscription work with the given session timeout.
    ///
    /// The default commit timeout shares one long-lived session; any other
    /// timeout gets a new session owned by the caller.
    pub async fn subscription_session(&self, session_timeout: Duration) -> Result<ScopedSession> {
        if session_timeout == self.settings.max_commit_timeout {
            return Ok(ScopedSession::shared(self.subscription.clone()));
        }

        let session = self
            .factory
            .create(SessionKind::Subscription, session_timeout)
            .await?;
        Ok(ScopedSession::owned(session))
    }

    /// Close every managed session.
    pub async fn shutdown(&self) {
        if let Some(lock) = self.lock.lock().await.take() {
            lock.session.close();
        }
        self.subscription.close();
        self.primary.close();
        info!("Session manager shut down");
    }
}
