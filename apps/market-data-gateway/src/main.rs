//! Market Data Gateway Binary
//!
//! Serves historical bars from a broker terminal over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data-gateway -- --config config.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `APP_CONFIG`: Config file path (default: config.yaml)
//! - `GATEWAY_BROKER_HOST` / `GATEWAY_BROKER_PORT`: Broker bridge address
//! - `GATEWAY_CLIENT_ID`: Fixed broker client id
//! - `GATEWAY_HTTP_HOST` / `GATEWAY_HTTP_PORT`: HTTP bind address
//! - `GATEWAY_LOG_LEVEL`: Log level when `RUST_LOG` is unset
//! - `RUST_LOG`: Log filter directives

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use market_data_gateway::application::services::SessionManager;
use market_data_gateway::application::use_cases::FetchHistoricalBarsUseCase;
use market_data_gateway::infrastructure::broker::{BridgeConfig, BridgeConnector};
use market_data_gateway::infrastructure::config::{Settings, load_settings};
use market_data_gateway::infrastructure::http::{AppState, create_router};
use market_data_gateway::infrastructure::metrics::init_metrics;
use market_data_gateway::infrastructure::telemetry::{self, TelemetryConfig};

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// CLI arguments for market-data-gateway.
#[derive(Parser, Debug)]
#[command(name = "market-data-gateway")]
#[command(about = "HTTP gateway for historical market data from a broker terminal")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "APP_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP bind host (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// HTTP bind port (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();

    let mut settings =
        load_settings(args.config.as_deref()).context("Failed to load configuration")?;
    apply_cli_overrides(&mut settings, &args);

    let _telemetry = telemetry::init(&TelemetryConfig::from_settings(&settings.observability))
        .context("Failed to initialize telemetry")?;

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder not installed, /metrics disabled");
    }

    tracing::info!(
        title = %settings.server.title,
        version = env!("CARGO_PKG_VERSION"),
        "Starting market data gateway"
    );
    log_config(&settings);

    let connector = BridgeConnector::new(BridgeConfig::from(&settings.broker))
        .context("Failed to create broker bridge client")?;
    let sessions = SessionManager::new(Arc::new(connector), settings.session_config());
    let fetch_bars = FetchHistoricalBarsUseCase::new(Arc::new(sessions));

    let state = AppState::new(
        Arc::new(fetch_bars),
        settings.defaults.clone(),
        settings.server.title.clone(),
    )
    .with_description(settings.server.description.clone());
    let app = create_router(state);

    let bind_address = settings.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!(%bind_address, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /histMktData");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /metrics");

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let shutdown = shutdown_token.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .into_future();

    serve_until_drained(server, &shutdown_token, SHUTDOWN_TIMEOUT)
        .await
        .context("HTTP server error")?;

    tracing::info!("Market data gateway stopped");
    Ok(())
}

/// Drive `server` to completion, giving up `timeout` after `token` fires.
///
/// In-flight requests release their sessions as they finish; stragglers are
/// abandoned so `main` can return and flush telemetry.
async fn serve_until_drained<F, E>(
    server: F,
    token: &CancellationToken,
    timeout: Duration,
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    let deadline = async {
        token.cancelled().await;
        tokio::time::sleep(timeout).await;
    };

    tokio::select! {
        result = server => result,
        () = deadline => {
            tracing::warn!("Shutdown timeout elapsed, abandoning in-flight requests");
            Ok(())
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

fn apply_cli_overrides(settings: &mut Settings, args: &Args) {
    if let Some(host) = &args.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
}

/// Log the effective configuration.
fn log_config(settings: &Settings) {
    tracing::info!(
        broker_host = %settings.broker.host,
        broker_port = settings.broker.port,
        client_id = ?settings.broker.client_id,
        randomize_client_id = settings.broker.randomize_client_id,
        http = %settings.bind_address(),
        "Configuration loaded"
    );
}

/// Wait for SIGTERM or Ctrl+C, then cancel `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
    token.cancel();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stuck_server_is_abandoned_after_timeout() {
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<(), std::io::Error> = serve_until_drained(
            std::future::pending(),
            &token,
            Duration::from_millis(20),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn server_result_is_returned_when_it_finishes_first() {
        let token = CancellationToken::new();

        let result = serve_until_drained(
            async { Err::<(), _>(std::io::Error::other("bind lost")) },
            &token,
            Duration::from_secs(30),
        )
        .await;
        assert_eq!(result.unwrap_err().to_string(), "bind lost");
    }
}
