//! Ensemble connection factory.
//!
//! Builds configured sessions: fixed address list rooted at the chroot,
//! per-kind timeouts, bounded exponential-backoff retry.

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use tracing::{debug, info, warn};

use super::{
    CoordinationError, EnsembleConnection, EnsembleConnector, EnsembleKind, EnsembleSession,
    Result, SessionError, SessionKind, SessionParams,
};
use crate::utils::retry::ensemble_backoff;

/// Opens sessions against one configured ensemble.
pub struct SessionFactory {
    connector: Arc<dyn EnsembleConnector>,
    connection: EnsembleConnection,
    connection_timeout: Duration,
}

impl SessionFactory {
    /// Create a factory for `connection`.
    ///
    /// Only fixed ZooKeeper ensembles are supported; any other kind is a
    /// configuration error.
    pub fn new(
        connector: Arc<dyn EnsembleConnector>,
        connection: EnsembleConnection,
        connection_timeout: Duration,
    ) -> Result<Self> {
        if connection.kind != EnsembleKind::Zookeeper {
            return Err(CoordinationError::UnsupportedEnsemble(connection.kind));
        }
        Ok(Self {
            connector,
            connection,
            connection_timeout,
        })
    }

    pub fn connection(&self) -> &EnsembleConnection {
        &self.connection
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Resolve the parameters a session of `kind` would be opened with.
    pub fn params(&self, kind: SessionKind, session_timeout: Duration) -> SessionParams {
        SessionParams {
            kind,
            connect_string: self.connection.addresses_joined(),
            chroot: self.connection.path_prepared(),
            session_timeout,
            connection_timeout: self.connection_timeout,
        }
    }

    /// Open a session and confirm it is usable, retrying with backoff.
    ///
    /// A session that opens but fails its probe is closed before the next
    /// attempt.
    pub async fn create(
        &self,
        kind: SessionKind,
        session_timeout: Duration,
    ) -> Result<Arc<dyn EnsembleSession>> {
        if self.connection.addresses.is_empty() {
            return Err(CoordinationError::Unavailable(format!(
                "ensemble {} has no addresses",
                self.connection
            )));
        }

        let params = self.params(kind, session_timeout);

        let session = (|| {
            let connector = self.connector.clone();
            let params = params.clone();
            async move {
                let session = connector.open(&params).await?;
                if let Err(e) = session.probe().await {
                    session.close();
                    return Err(e);
                }
                Ok::<_, SessionError>(session)
            }
        })
        .retry(ensemble_backoff())
        .notify(|err: &SessionError, dur: Duration| {
            warn!(kind = %kind, error = %err, delay = ?dur, "Ensemble session failed, retrying");
        })
        .await
        .map_err(|e| {
            CoordinationError::Unavailable(format!(
                "failed to create {} session against {}: {}",
                kind, self.connection, e
            ))
        })?;

        info!(
            kind = %kind,
            session_id = session.id(),
            session_timeout = ?session_timeout,
            ensemble = %self.connection,
            "Ensemble session opened"
        );
        debug!(params = ?params, "Session parameters");
        Ok(session)
    }
}
