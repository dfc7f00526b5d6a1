//! Ensemble session capability and the connector that opens sessions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Ensemble-assigned session identifier.
pub type SessionId = u64;

/// What a session is used for; drives timeouts and sharing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Process-lifetime session for registry reads and writes.
    Primary,
    /// Rotating session used to take locks.
    Lock,
    /// Session backing subscription state.
    Subscription,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Primary => f.write_str("primary"),
            SessionKind::Lock => f.write_str("lock"),
            SessionKind::Subscription => f.write_str("subscription"),
        }
    }
}

/// Fully resolved parameters for opening one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub kind: SessionKind,
    /// Comma-joined `host:port` list.
    pub connect_string: String,
    /// Chroot prefix applied to every path; empty for `/`.
    pub chroot: String,
    pub session_timeout: Duration,
    pub connection_timeout: Duration,
}

/// Errors reported by an ensemble client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Connection to {connect_string} failed: {message}")]
    Connect {
        connect_string: String,
        message: String,
    },

    #[error("Session {0} is not usable: {1}")]
    Unusable(SessionId, String),

    #[error("Session {0} is closed")]
    Closed(SessionId),
}

/// An open session against the coordination ensemble.
///
/// Closing a session releases every ephemeral node (leases included) the
/// ensemble associates with it.
#[async_trait]
pub trait EnsembleSession: Send + Sync + fmt::Debug {
    fn id(&self) -> SessionId;

    fn params(&self) -> &SessionParams;

    /// Round-trip to the ensemble confirming the session can serve requests.
    async fn probe(&self) -> Result<(), SessionError>;

    /// Tear the session down. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Ensemble client entry point.
#[async_trait]
pub trait EnsembleConnector: Send + Sync {
    /// Open a new session, bounded by `params.connection_timeout`.
    async fn open(&self, params: &SessionParams)
        -> Result<Arc<dyn EnsembleSession>, SessionError>;
}
