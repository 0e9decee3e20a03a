//! Fetch Historical Bars Use Case

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::ports::{BrokerConnection, BrokerConnector};
use crate::application::services::SessionManager;
use crate::domain::{Bar, BarQuery, HistoricalBarRequest, Instrument, RequestStage};
use crate::error::GatewayError;

/// Use case for fetching historical bars for one symbol.
///
/// Opens a session, resolves and qualifies the symbol, fetches bars and
/// releases the session before returning, whatever the outcome.
pub struct FetchHistoricalBarsUseCase<C>
where
    C: BrokerConnector,
{
    sessions: Arc<SessionManager<C>>,
}

impl<C> FetchHistoricalBarsUseCase<C>
where
    C: BrokerConnector,
{
    /// Create a new `FetchHistoricalBarsUseCase`.
    pub const fn new(sessions: Arc<SessionManager<C>>) -> Self {
        Self { sessions }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// - `CONNECTION_FAILED` if the handshake fails
    /// - `INSTRUMENT_NOT_FOUND` if the symbol has no usable contract
    /// - `BROKER_OPERATION_FAILED` if resolution, qualification or the
    ///   bar request fails
    pub async fn execute(&self, query: &BarQuery) -> Result<Vec<Bar>, GatewayError> {
        // 1. Open a session
        debug!(symbol = %query.symbol, stage = %RequestStage::Connecting, "Acquiring broker session");
        let session = self.sessions.acquire().await.map_err(|e| {
            GatewayError::from(e)
                .at_stage(RequestStage::Connecting)
                .with_context("symbol", &query.symbol)
        })?;
        let client_id = session.client_id();

        // 2. Resolve, qualify, fetch
        let outcome = fetch_bars(session.connection(), query).await;

        // 3. Release regardless of outcome
        debug!(client_id = %client_id, stage = %RequestStage::Disconnecting, "Releasing broker session");
        session.release().await;

        match outcome {
            Ok(bars) => {
                info!(
                    symbol = %query.symbol,
                    client_id = %client_id,
                    bar_count = bars.len(),
                    "Fetched historical bars"
                );
                Ok(bars)
            }
            Err(e) => Err(e
                .with_context("symbol", &query.symbol)
                .with_context("client_id", client_id.to_string())),
        }
    }
}

async fn fetch_bars<Conn>(connection: &Conn, query: &BarQuery) -> Result<Vec<Bar>, GatewayError>
where
    Conn: BrokerConnection + ?Sized,
{
    let candidate = resolve_contract(connection, &query.symbol).await?;
    let contract = qualify_contract(connection, &query.symbol, candidate).await?;

    debug!(
        symbol = %query.symbol,
        con_id = ?contract.con_id,
        stage = %RequestStage::Fetching,
        "Requesting historical bars"
    );
    let request = HistoricalBarRequest::new(contract, query);
    connection
        .historical_bars(&request)
        .await
        .map_err(|e| GatewayError::from(e).at_stage(RequestStage::Fetching))
}

/// First candidate's descriptor for a smart-routed USD stock.
async fn resolve_contract<Conn>(connection: &Conn, symbol: &str) -> Result<Instrument, GatewayError>
where
    Conn: BrokerConnection + ?Sized,
{
    debug!(symbol, stage = %RequestStage::Resolving, "Resolving contract");
    let details = connection
        .contract_details(&Instrument::stock(symbol))
        .await
        .map_err(|e| GatewayError::from(e).at_stage(RequestStage::Resolving))?;

    let Some(first) = details.first() else {
        return Err(GatewayError::instrument_not_found(symbol).at_stage(RequestStage::Resolving));
    };

    first.usable_contract().cloned().ok_or_else(|| {
        GatewayError::instrument_not_found(symbol)
            .at_stage(RequestStage::Resolving)
            .with_context("reason", "candidate has no usable contract")
    })
}

async fn qualify_contract<Conn>(
    connection: &Conn,
    symbol: &str,
    candidate: Instrument,
) -> Result<Instrument, GatewayError>
where
    Conn: BrokerConnection + ?Sized,
{
    debug!(symbol, stage = %RequestStage::Qualifying, "Qualifying contract");
    let qualified = connection
        .qualify_instruments(std::slice::from_ref(&candidate))
        .await
        .map_err(|e| GatewayError::from(e).at_stage(RequestStage::Qualifying))?;

    qualified.into_iter().next().ok_or_else(|| {
        GatewayError::instrument_not_found(symbol)
            .at_stage(RequestStage::Qualifying)
            .with_context("reason", "qualification returned nothing")
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::application::ports::{BrokerError, ConnectionInfo, MockBrokerConnection};
    use crate::application::services::SessionConfig;
    use crate::domain::{ClientId, ContractDetails};
    use crate::error::ErrorCode;

    struct SingleConnector {
        connection: Mutex<Option<MockBrokerConnection>>,
        fail_with: Option<BrokerError>,
    }

    #[async_trait]
    impl BrokerConnector for SingleConnector {
        type Connection = MockBrokerConnection;

        async fn connect(&self, _info: &ConnectionInfo) -> Result<MockBrokerConnection, BrokerError> {
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            self.connection
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| BrokerError::connection("already connected"))
        }
    }

    fn use_case(connector: SingleConnector) -> FetchHistoricalBarsUseCase<SingleConnector> {
        let config = SessionConfig::new("127.0.0.1", 7497).with_client_id(ClientId::new(4201));
        FetchHistoricalBarsUseCase::new(Arc::new(SessionManager::new(Arc::new(connector), config)))
    }

    fn with_connection(connection: MockBrokerConnection) -> FetchHistoricalBarsUseCase<SingleConnector> {
        use_case(SingleConnector {
            connection: Mutex::new(Some(connection)),
            fail_with: None,
        })
    }

    // A connection that must be released exactly once.
    fn releasing_connection() -> MockBrokerConnection {
        let mut connection = MockBrokerConnection::new();
        connection.expect_is_connected().times(1).return_const(true);
        connection.expect_disconnect().times(1).returning(|| Ok(()));
        connection
    }

    fn query(symbol: &str) -> BarQuery {
        BarQuery {
            symbol: symbol.to_string(),
            end_date_time: String::new(),
            duration: "1 D".to_string(),
            bar_size: "1 min".to_string(),
            what_to_show: "TRADES".to_string(),
            use_rth: true,
        }
    }

    fn qualified(symbol: &str) -> Instrument {
        let mut instrument = Instrument::stock(symbol);
        instrument.con_id = Some(265_598);
        instrument.primary_exchange = Some("NASDAQ".to_string());
        instrument
    }

    #[tokio::test]
    async fn fetches_bars_for_qualified_contract() {
        let mut connection = releasing_connection();
        connection
            .expect_contract_details()
            .withf(|i: &Instrument| i.symbol == "AAPL" && i.exchange == "SMART" && i.currency == "USD")
            .times(1)
            .returning(|i| Ok(vec![ContractDetails::for_contract(i.clone())]));
        connection
            .expect_qualify_instruments()
            .withf(|list: &[Instrument]| list.len() == 1 && list[0].symbol == "AAPL")
            .times(1)
            .returning(|_| Ok(vec![qualified("AAPL")]));
        connection
            .expect_historical_bars()
            .withf(|r: &HistoricalBarRequest| {
                r.contract().con_id == Some(265_598) && r.end_date_time().is_empty()
            })
            .times(1)
            .returning(|_| {
                Ok(vec![Bar::from_fields([
                    ("date", Value::from("2024-07-10")),
                    ("open", Value::from(100)),
                    ("close", Value::from(110)),
                ])])
            });

        let bars = with_connection(connection).execute(&query("AAPL")).await.unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].get("close"), Some(&Value::from(110)));
    }

    #[tokio::test]
    async fn passes_query_fields_through_unmodified() {
        let mut connection = releasing_connection();
        connection
            .expect_contract_details()
            .returning(|i| Ok(vec![ContractDetails::for_contract(i.clone())]));
        connection
            .expect_qualify_instruments()
            .returning(|list| Ok(list.to_vec()));
        connection
            .expect_historical_bars()
            .withf(|r: &HistoricalBarRequest| {
                r.end_date_time() == "20240710 14:00:00"
                    && !r.use_rth()
                    && r.duration() == "2 W"
                    && r.bar_size() == "1 hour"
                    && r.what_to_show() == "MIDPOINT"
            })
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let mut q = query("MSFT");
        q.end_date_time = "20240710 14:00:00".to_string();
        q.use_rth = false;
        q.duration = "2 W".to_string();
        q.bar_size = "1 hour".to_string();
        q.what_to_show = "MIDPOINT".to_string();

        let bars = with_connection(connection).execute(&q).await.unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn zero_candidates_is_not_found_and_releases() {
        let mut connection = releasing_connection();
        connection
            .expect_contract_details()
            .returning(|_| Ok(Vec::new()));
        connection.expect_qualify_instruments().never();
        connection.expect_historical_bars().never();

        let error = with_connection(connection)
            .execute(&query("ZZZZ"))
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::InstrumentNotFound);
        assert_eq!(error.message(), "No contract found for symbol 'ZZZZ'");
        assert_eq!(error.context_value("stage"), Some("resolving"));
        assert_eq!(error.context_value("client_id"), Some("4201"));
    }

    #[tokio::test]
    async fn candidate_without_contract_is_not_found() {
        let mut connection = releasing_connection();
        connection.expect_contract_details().returning(|_| {
            Ok(vec![ContractDetails {
                contract: None,
                long_name: Some("GHOST".to_string()),
                min_tick: None,
            }])
        });
        connection.expect_qualify_instruments().never();

        let error = with_connection(connection)
            .execute(&query("GHST"))
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::InstrumentNotFound);
        assert_eq!(error.message(), "No contract found for symbol 'GHST'");
    }

    #[tokio::test]
    async fn empty_qualification_is_not_found() {
        let mut connection = releasing_connection();
        connection
            .expect_contract_details()
            .returning(|i| Ok(vec![ContractDetails::for_contract(i.clone())]));
        connection
            .expect_qualify_instruments()
            .returning(|_| Ok(Vec::new()));
        connection.expect_historical_bars().never();

        let error = with_connection(connection)
            .execute(&query("AAPL"))
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::InstrumentNotFound);
        assert_eq!(error.context_value("stage"), Some("qualifying"));
    }

    #[tokio::test]
    async fn resolution_failure_surfaces_message_and_releases() {
        let mut connection = releasing_connection();
        connection
            .expect_contract_details()
            .returning(|_| Err(BrokerError::operation("Error 200: ambiguous contract")));

        let error = with_connection(connection)
            .execute(&query("AAPL"))
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::BrokerOperationFailed);
        assert_eq!(error.message(), "Error 200: ambiguous contract");
        assert_eq!(error.context_value("stage"), Some("resolving"));
    }

    #[tokio::test]
    async fn fetch_failure_releases_and_returns_no_partial_result() {
        let mut connection = releasing_connection();
        connection
            .expect_contract_details()
            .returning(|i| Ok(vec![ContractDetails::for_contract(i.clone())]));
        connection
            .expect_qualify_instruments()
            .returning(|list| Ok(list.to_vec()));
        connection
            .expect_historical_bars()
            .returning(|_| Err(BrokerError::operation("pacing violation")));

        let error = with_connection(connection)
            .execute(&query("AAPL"))
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::BrokerOperationFailed);
        assert_eq!(error.context_value("stage"), Some("fetching"));
    }

    #[tokio::test]
    async fn connection_failure_maps_to_connection_code() {
        let use_case = use_case(SingleConnector {
            connection: Mutex::new(None),
            fail_with: Some(BrokerError::connection("connection refused")),
        });

        let error = use_case.execute(&query("AAPL")).await.unwrap_err();

        assert_eq!(error.code(), ErrorCode::ConnectionFailed);
        assert!(error.message().contains("connection refused"));
        assert_eq!(error.context_value("stage"), Some("connecting"));
    }
}
