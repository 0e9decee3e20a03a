//! Broker Port (Driven Port)
//!
//! Interface to the broker gateway. A connector performs the handshake; the
//! connection it returns is the narrow surface the gateway uses for the
//! lifetime of one request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ClientId, ContractDetails, HistoricalBarRequest, Instrument};

/// Address and identity of one broker session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Broker gateway host.
    pub host: String,
    /// Broker gateway port.
    pub port: u16,
    /// Client id presented during the handshake.
    pub client_id: ClientId,
}

impl ConnectionInfo {
    /// Create connection info.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, client_id: ClientId) -> Self {
        Self {
            host: host.into(),
            port,
            client_id,
        }
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} (client {})", self.host, self.port, self.client_id)
    }
}

/// Broker port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Handshake failed or the gateway is unreachable.
    #[error("Broker connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// The broker rejected or failed a request on a live session.
    #[error("{message}")]
    Operation {
        /// Error details, surfaced to the caller verbatim.
        message: String,
    },

    /// The broker answered with something the adapter could not decode.
    #[error("Broker protocol error: {message}")]
    Protocol {
        /// Error details.
        message: String,
    },
}

impl BrokerError {
    /// Connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Operation error.
    #[must_use]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Opens broker sessions.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connection type produced by a successful handshake.
    type Connection: BrokerConnection + 'static;

    /// Perform the handshake. Suspends until it completes or fails.
    async fn connect(&self, info: &ConnectionInfo) -> Result<Self::Connection, BrokerError>;
}

/// One live broker session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Liveness probe.
    async fn is_connected(&self) -> bool;

    /// Close the session.
    async fn disconnect(&self) -> Result<(), BrokerError>;

    /// Look up candidate contracts matching a descriptor.
    async fn contract_details(
        &self,
        instrument: &Instrument,
    ) -> Result<Vec<ContractDetails>, BrokerError>;

    /// Canonicalize descriptors against broker reference data.
    async fn qualify_instruments(
        &self,
        instruments: &[Instrument],
    ) -> Result<Vec<Instrument>, BrokerError>;

    /// Fetch historical bars.
    async fn historical_bars(
        &self,
        request: &HistoricalBarRequest,
    ) -> Result<Vec<Bar>, BrokerError>;
}
