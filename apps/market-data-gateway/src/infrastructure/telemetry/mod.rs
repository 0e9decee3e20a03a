//! Logging and OpenTelemetry Tracing
//!
//! Installs the global `tracing` subscriber: an `EnvFilter`, a `fmt` layer in
//! pretty or JSON form, and optionally an OTLP exporter for spans.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Filter directives; wins over the configured level
//! - `OTEL_ENABLED`: `true` / `false`, overrides `observability.otel.enabled`
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint
//! - `OTEL_SERVICE_NAME`: Service name for traces

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::infrastructure::config::ObservabilitySettings;

/// Telemetry initialization errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Log level or filter directive is malformed.
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// OTLP exporter could not be built.
    #[error("Failed to create OTLP exporter: {0}")]
    Exporter(String),

    /// A global subscriber is already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Guard that shuts down OpenTelemetry when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Whether OpenTelemetry export is enabled.
    pub otel_enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service name for traces.
    pub service_name: String,
}

impl TelemetryConfig {
    /// Build from settings, then apply `OTEL_*` environment overrides.
    #[must_use]
    pub fn from_settings(settings: &ObservabilitySettings) -> Self {
        let mut config = Self {
            level: settings.logging.level.clone(),
            json: settings.logging.format == "json",
            otel_enabled: settings.otel.enabled,
            otlp_endpoint: settings.otel.endpoint.clone(),
            service_name: settings.otel.service_name.clone(),
        };

        if let Ok(v) = std::env::var("OTEL_ENABLED") {
            config.otel_enabled = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
            config.otlp_endpoint = endpoint;
        }
        if let Ok(name) = std::env::var("OTEL_SERVICE_NAME") {
            config.service_name = name;
        }
        config
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.level)?,
        };
        Ok(filter
            .add_directive("h2=warn".parse()?)
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=info".parse()?))
    }
}

/// Install the global subscriber.
///
/// Returns a guard that must be kept alive for the duration of the program.
///
/// # Errors
///
/// Returns an error if the filter is malformed, the OTLP exporter cannot be
/// built, or a subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = config.env_filter()?;

    let pretty_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });

    let tracer_provider = if config.otel_enabled {
        let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.otlp_endpoint)
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

        Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(otlp_exporter)
                .with_resource(
                    opentelemetry_sdk::Resource::builder()
                        .with_service_name(config.service_name.clone())
                        .build(),
                )
                .build(),
        )
    } else {
        None
    };

    let otel_layer = tracer_provider.as_ref().map(|provider| {
        let tracer = provider.tracer(config.service_name.clone());
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    Ok(TelemetryGuard { tracer_provider })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{LoggingSettings, OtelSettings};

    #[test]
    fn config_follows_settings() {
        let settings = ObservabilitySettings {
            logging: LoggingSettings {
                level: "debug".to_string(),
                format: "json".to_string(),
            },
            otel: OtelSettings::default(),
        };

        let config = TelemetryConfig::from_settings(&settings);
        assert_eq!(config.level, "debug");
        assert!(config.json);
    }

    #[test]
    fn malformed_level_is_rejected() {
        let config = TelemetryConfig {
            level: "gateway=notalevel".to_string(),
            json: false,
            otel_enabled: false,
            otlp_endpoint: String::new(),
            service_name: String::new(),
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(config.env_filter(), Err(TelemetryError::Filter(_))));
        }
    }
}
