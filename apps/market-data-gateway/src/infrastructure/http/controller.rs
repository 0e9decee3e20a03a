//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the historical-bars use case.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use futures::FutureExt;
use tracing::{Instrument, debug, error, warn};
use uuid::Uuid;

use crate::application::ports::BrokerConnector;
use crate::application::use_cases::FetchHistoricalBarsUseCase;
use crate::domain::{Bar, RequestStage};
use crate::error::GatewayError;
use crate::infrastructure::config::QueryDefaults;
use crate::infrastructure::metrics::{self, get_metrics_handle};

use super::request::HistMktDataParams;
use super::response::HealthResponse;

/// Application state shared across handlers.
pub struct AppState<C>
where
    C: BrokerConnector,
{
    /// Use case for fetching historical bars.
    pub fetch_bars: Arc<FetchHistoricalBarsUseCase<C>>,
    /// Defaults for optional query parameters.
    pub defaults: Arc<QueryDefaults>,
    /// Service title reported by `/health`.
    pub title: String,
    /// Service description reported by `/health`.
    pub description: String,
    /// Application version.
    pub version: String,
    /// Start-up instant for uptime reporting.
    pub started_at: Instant,
}

impl<C> AppState<C>
where
    C: BrokerConnector,
{
    /// Create state stamped with the crate version and the current instant.
    pub fn new(
        fetch_bars: Arc<FetchHistoricalBarsUseCase<C>>,
        defaults: QueryDefaults,
        title: impl Into<String>,
    ) -> Self {
        Self {
            fetch_bars,
            defaults: Arc::new(defaults),
            title: title.into(),
            description: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }

    /// Set the description reported by `/health`.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<C> Clone for AppState<C>
where
    C: BrokerConnector,
{
    fn clone(&self) -> Self {
        Self {
            fetch_bars: Arc::clone(&self.fetch_bars),
            defaults: Arc::clone(&self.defaults),
            title: self.title.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            started_at: self.started_at,
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<C>(state: AppState<C>) -> Router
where
    C: BrokerConnector + 'static,
{
    Router::new()
        .route("/histMktData", get(hist_mkt_data::<C>))
        .route("/histMktData/", get(hist_mkt_data::<C>))
        .route("/health", get(health_check::<C>))
        .route("/healthz", get(liveness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Historical bars endpoint.
async fn hist_mkt_data<C>(
    State(state): State<AppState<C>>,
    query: Result<Query<HistMktDataParams>, QueryRejection>,
) -> Response
where
    C: BrokerConnector + 'static,
{
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "hist_mkt_data",
        %request_id,
        symbol = tracing::field::Empty
    );

    async move {
        let started = Instant::now();
        let params = query
            .map(|Query(params)| params)
            .map_err(|rejection| GatewayError::malformed_query(rejection.body_text()));
        let outcome = fetch_bars(&state, params).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(bars) => {
                debug!(
                    stage = %RequestStage::Serializing,
                    bar_count = bars.len(),
                    "Serializing bars"
                );
                metrics::record_request("ok", elapsed);
                debug!(stage = %RequestStage::Responding, "Responding");
                (StatusCode::OK, Json(bars)).into_response()
            }
            Err(e) => {
                log_failure(&e);
                metrics::record_request(e.code().reason(), elapsed);
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn fetch_bars<C>(
    state: &AppState<C>,
    params: Result<HistMktDataParams, GatewayError>,
) -> Result<Vec<Bar>, GatewayError>
where
    C: BrokerConnector + 'static,
{
    debug!(stage = %RequestStage::Validating, "Validating parameters");
    let query = params
        .and_then(|params| params.into_query(&state.defaults))
        .map_err(|e| e.at_stage(RequestStage::Validating))?;
    tracing::Span::current().record("symbol", query.symbol.as_str());

    // A panic unwinds through the session guard, which schedules the release.
    AssertUnwindSafe(state.fetch_bars.execute(&query))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(GatewayError::internal(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected fault while handling request".to_string())
}

fn log_failure(e: &GatewayError) {
    if e.code().is_client_error() {
        warn!(
            code = %e.code(),
            context = ?e.context(),
            "Request rejected: {}",
            e.message()
        );
    } else {
        error!(
            code = %e.code(),
            context = ?e.context(),
            "Request failed: {}",
            e.message()
        );
    }
}

/// Health check endpoint.
async fn health_check<C>(State(state): State<AppState<C>>) -> impl IntoResponse
where
    C: BrokerConnector + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.title.clone(),
        description: state.description.clone(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
    })
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use test_case::test_case;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::{BrokerError, ConnectionInfo, MockBrokerConnection};
    use crate::application::services::{SessionConfig, SessionManager};

    // Refuses every handshake; enough for endpoints that never reach the broker.
    struct RefusingConnector;

    #[async_trait]
    impl BrokerConnector for RefusingConnector {
        type Connection = MockBrokerConnection;

        async fn connect(&self, _info: &ConnectionInfo) -> Result<MockBrokerConnection, BrokerError> {
            Err(BrokerError::connection("connection refused"))
        }
    }

    fn create_test_state() -> AppState<RefusingConnector> {
        let sessions = SessionManager::new(
            Arc::new(RefusingConnector),
            SessionConfig::new("127.0.0.1", 7497),
        );
        let mut state = AppState::new(
            Arc::new(FetchHistoricalBarsUseCase::new(Arc::new(sessions))),
            QueryDefaults::default(),
            "Test Gateway",
        )
        .with_description("Gateway under test");
        state.version = "1.0.0-test".to_string();
        state
    }

    async fn get(uri: &str) -> Response {
        create_router(create_test_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "Test Gateway");
        assert_eq!(json["description"], "Gateway under test");
        assert_eq!(json["version"], "1.0.0-test");
    }

    #[tokio::test]
    async fn liveness_returns_ok() {
        let response = get("/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn connection_failure_is_500_with_message() {
        let response = get("/histMktData?symbol=AAPL").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["code"], "CONNECTION_FAILED");
        assert!(json["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn invalid_use_rth_is_400() {
        let response = get("/histMktData?symbol=AAPL&use_rth=maybe").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_PARAMETER");
    }

    #[test_case("/histMktData?symbol=AAPL&symbol=MSFT", "symbol" ; "repeated symbol")]
    #[test_case("/histMktData?symbol=AAPL&use_rth=1&use_rth=0", "use_rth" ; "repeated use_rth")]
    #[tokio::test]
    async fn undecodable_query_is_json_400(uri: &str, field: &str) {
        let response = get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");

        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_PARAMETER");
        assert!(json["error"].as_str().unwrap().contains(field));
    }

    #[test]
    fn panic_message_extracts_payload() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(boxed.as_ref()), "kaboom");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(
            panic_message(boxed.as_ref()),
            "unexpected fault while handling request"
        );
    }
}
