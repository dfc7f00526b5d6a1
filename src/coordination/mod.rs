//! Coordination ensemble client management.
//!
//! This module contains:
//! - `EnsembleConnection`: parsed ensemble address list and chroot
//! - `EnsembleSession` / `EnsembleConnector` traits: the ensemble client seam
//! - `SessionFactory`: configured session creation with retry
//! - `SessionManager`: primary, rotating lock, and subscription sessions
//! - Implementations: Mock

mod ensemble;
mod factory;
mod manager;
pub mod mock;
mod session;

pub use ensemble::{AddressPort, EnsembleConnection, EnsembleKind};
pub use factory::SessionFactory;
pub use manager::{
    ScopedSession, SessionManager, SessionOwnership, SessionSettings, LOCK_SESSION_LIVE_PERIOD,
};
pub use mock::MockEnsemble;
pub use session::{
    EnsembleConnector, EnsembleSession, SessionError, SessionId, SessionKind, SessionParams,
};

/// Result type for coordination operations.
pub type Result<T> = std::result::Result<T, CoordinationError>;

/// Errors raised while managing ensemble sessions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinationError {
    #[error("Coordination ensemble unavailable: {0}")]
    Unavailable(String),

    #[error("Ensemble connection type '{0}' is not supported")]
    UnsupportedEnsemble(EnsembleKind),

    #[error("Invalid ensemble connection '{connection}': {reason}")]
    InvalidConnection { connection: String, reason: String },
}

impl CoordinationError {
    /// True for errors that only configuration changes can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoordinationError::UnsupportedEnsemble(_) | CoordinationError::InvalidConnection { .. }
        )
    }
}
