//! Bridge adapter implementing the broker ports.

use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::{BrokerConnection, BrokerConnector, BrokerError, ConnectionInfo};
use crate::domain::{Bar, ClientId, ContractDetails, HistoricalBarRequest, Instrument};

use super::api_types::{OpenSessionRequest, SessionStatus};
use super::config::BridgeConfig;
use super::error::BridgeError;
use super::http_client::BridgeHttpClient;

/// Opens sessions on a broker bridge.
///
/// The bridge address comes from the [`ConnectionInfo`] of each handshake,
/// so one connector serves whichever host and port the session manager
/// targets.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    client: BridgeHttpClient,
    config: BridgeConfig,
}

impl BridgeConnector {
    /// Create a new bridge connector.
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let client = BridgeHttpClient::new(&config)?;
        Ok(Self { client, config })
    }

    async fn open_session(&self, base_url: &str, client_id: ClientId) -> Result<(), BridgeError> {
        let status: SessionStatus = self
            .client
            .post(
                &format!("{base_url}/v1/sessions"),
                &OpenSessionRequest { client_id },
            )
            .await?;

        if !status.connected {
            return Err(BridgeError::SessionRejected {
                client_id: client_id.value(),
            });
        }

        debug!(
            %client_id,
            server_version = ?status.server_version,
            "Bridge session established"
        );
        Ok(())
    }
}

#[async_trait]
impl BrokerConnector for BridgeConnector {
    type Connection = BridgeConnection;

    async fn connect(&self, info: &ConnectionInfo) -> Result<BridgeConnection, BrokerError> {
        let base_url = self.config.base_url(&info.host, info.port);

        self.open_session(&base_url, info.client_id)
            .await
            .map_err(BridgeError::into_connection_error)?;

        Ok(BridgeConnection {
            client: self.client.clone(),
            session_url: format!("{base_url}/v1/sessions/{}", info.client_id),
        })
    }
}

/// A live bridge session.
#[derive(Debug, Clone)]
pub struct BridgeConnection {
    client: BridgeHttpClient,
    session_url: String,
}

impl BridgeConnection {
    fn url(&self, action: &str) -> String {
        format!("{}/{action}", self.session_url)
    }
}

#[async_trait]
impl BrokerConnection for BridgeConnection {
    async fn is_connected(&self) -> bool {
        match self
            .client
            .get_optional::<SessionStatus>(&self.session_url)
            .await
        {
            Ok(status) => status.is_some_and(|s| s.connected),
            Err(e) => {
                debug!(error = %e, "Liveness probe failed, treating session as gone");
                false
            }
        }
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.client.delete(&self.session_url).await?;
        Ok(())
    }

    async fn contract_details(
        &self,
        instrument: &Instrument,
    ) -> Result<Vec<ContractDetails>, BrokerError> {
        let details = self
            .client
            .post(&self.url("contract-details"), instrument)
            .await?;
        Ok(details)
    }

    async fn qualify_instruments(
        &self,
        instruments: &[Instrument],
    ) -> Result<Vec<Instrument>, BrokerError> {
        let qualified = self.client.post(&self.url("qualify"), instruments).await?;
        Ok(qualified)
    }

    async fn historical_bars(
        &self,
        request: &HistoricalBarRequest,
    ) -> Result<Vec<Bar>, BrokerError> {
        let bars = self
            .client
            .post(&self.url("historical-data"), request)
            .await?;
        Ok(bars)
    }
}
