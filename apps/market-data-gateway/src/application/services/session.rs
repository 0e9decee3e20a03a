//! Connection-scoped broker sessions.
//!
//! Each request gets its own broker connection, opened by
//! [`SessionManager::acquire`] and closed by [`Session::release`]. A
//! [`Session`] is a guard: if it is dropped without an explicit release
//! (early return, panic, or a cancelled request future) it schedules the
//! release on the current tokio runtime.
//!
//! Release never fails from the caller's point of view. If the broker has
//! already dropped the session the liveness probe short-circuits the
//! teardown; if the teardown itself fails the error is logged and counted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::ports::{BrokerConnection, BrokerConnector, BrokerError, ConnectionInfo};
use crate::domain::{ClientId, ClientIdGenerator};
use crate::infrastructure::metrics;

/// Where and how sessions are opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Broker gateway host.
    pub host: String,
    /// Broker gateway port.
    pub port: u16,
    /// Fixed client id; generated per session when absent.
    pub client_id: Option<ClientId>,
    /// Generator used when no fixed id is configured.
    pub generator: ClientIdGenerator,
}

impl SessionConfig {
    /// Config with a randomized client id per session.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: None,
            generator: ClientIdGenerator::default(),
        }
    }

    /// Use a fixed client id for every session.
    #[must_use]
    pub const fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Use a specific client id generator.
    #[must_use]
    pub const fn with_generator(mut self, generator: ClientIdGenerator) -> Self {
        self.generator = generator;
        self
    }
}

/// Opens one broker session per unit of work.
pub struct SessionManager<C>
where
    C: BrokerConnector,
{
    connector: Arc<C>,
    config: SessionConfig,
}

impl<C> SessionManager<C>
where
    C: BrokerConnector,
{
    /// Create a new `SessionManager`.
    pub const fn new(connector: Arc<C>, config: SessionConfig) -> Self {
        Self { connector, config }
    }

    /// Session configuration.
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a session using the configured or a generated client id.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the handshake fails. Nothing is
    /// retried.
    pub async fn acquire(&self) -> Result<Session<C::Connection>, BrokerError> {
        self.acquire_with(self.config.client_id).await
    }

    /// Open a session with an explicit client id, or a generated one when
    /// `client_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the handshake fails.
    pub async fn acquire_with(
        &self,
        client_id: Option<ClientId>,
    ) -> Result<Session<C::Connection>, BrokerError> {
        let client_id = client_id.unwrap_or_else(|| self.config.generator.generate());
        let info = ConnectionInfo::new(self.config.host.clone(), self.config.port, client_id);

        match self.connector.connect(&info).await {
            Ok(connection) => {
                metrics::record_session_opened();
                info!(
                    host = %info.host,
                    port = info.port,
                    client_id = %info.client_id,
                    "Broker session opened"
                );
                Ok(Session::new(connection, info))
            }
            Err(e) => {
                metrics::record_connection_failure();
                warn!(
                    host = %info.host,
                    port = info.port,
                    client_id = %info.client_id,
                    error = %e,
                    "Broker handshake failed"
                );
                Err(e)
            }
        }
    }

    /// Close a session. Equivalent to [`Session::release`].
    pub async fn release(&self, session: Session<C::Connection>) {
        session.release().await;
    }
}

/// Guard over one live broker connection.
pub struct Session<Conn>
where
    Conn: BrokerConnection + 'static,
{
    connection: Arc<Conn>,
    info: ConnectionInfo,
    released: bool,
}

impl<Conn> Session<Conn>
where
    Conn: BrokerConnection + 'static,
{
    fn new(connection: Conn, info: ConnectionInfo) -> Self {
        Self {
            connection: Arc::new(connection),
            info,
            released: false,
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Conn {
        &self.connection
    }

    /// Address and client id of this session.
    pub const fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Client id of this session.
    pub const fn client_id(&self) -> ClientId {
        self.info.client_id
    }

    /// Close the session. Errors are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        release_connection(self.connection.as_ref(), &self.info).await;
    }
}

impl<Conn> Drop for Session<Conn>
where
    Conn: BrokerConnection + 'static,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        warn!(
            client_id = %self.info.client_id,
            "Broker session dropped without release, releasing in background"
        );

        let connection = Arc::clone(&self.connection);
        let info = self.info.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_connection(connection.as_ref(), &info).await;
                });
            }
            Err(_) => {
                metrics::record_release_failure();
                warn!(
                    client_id = %info.client_id,
                    "No runtime available to release broker session"
                );
            }
        }
    }
}

async fn release_connection<Conn>(connection: &Conn, info: &ConnectionInfo)
where
    Conn: BrokerConnection + ?Sized,
{
    if !connection.is_connected().await {
        debug!(client_id = %info.client_id, "Broker session already closed");
        metrics::record_session_closed();
        return;
    }

    match connection.disconnect().await {
        Ok(()) => {
            debug!(client_id = %info.client_id, "Broker session closed");
        }
        Err(e) => {
            metrics::record_release_failure();
            warn!(
                client_id = %info.client_id,
                error = %e,
                "Failed to close broker session"
            );
        }
    }
    metrics::record_session_closed();
}
