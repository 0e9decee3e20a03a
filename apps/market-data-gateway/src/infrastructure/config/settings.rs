//! Gateway Configuration Settings
//!
//! Settings are read from a YAML file with `${VAR}` / `${VAR:-default}`
//! interpolation, then explicit `GATEWAY_*` environment overrides are
//! applied, then the result is validated. Every section and field has a
//! default, so a file only needs to list what it changes.
//!
//! # Environment Overrides
//!
//! - `GATEWAY_BROKER_HOST`: Broker gateway host
//! - `GATEWAY_BROKER_PORT`: Broker gateway port
//! - `GATEWAY_CLIENT_ID`: Fixed client id for every session
//! - `GATEWAY_HTTP_HOST`: HTTP bind host
//! - `GATEWAY_HTTP_PORT`: HTTP bind port
//! - `GATEWAY_LOG_LEVEL`: Log level

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::SessionConfig;
use crate::domain::client_id::{DEFAULT_MULTIPLIER, DEFAULT_OFFSET_RANGE};
use crate::domain::{ClientId, ClientIdGenerator};
use crate::infrastructure::resources::resolve_resource_path;

/// Config file used when neither `--config` nor `APP_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("Config file not found: {}", .path.display())]
    NotFound {
        /// Resolved path that was looked up.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ReadError {
        /// Path to the config file.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value '{value}' for environment variable {var}")]
    InvalidOverride {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Broker gateway connection settings.
    #[serde(default)]
    pub broker: BrokerSettings,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,
    /// Defaults for optional query parameters.
    #[serde(default)]
    pub defaults: QueryDefaults,
    /// Logging and tracing.
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl Settings {
    /// Session manager configuration derived from the broker section.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let generator = if self.broker.randomize_client_id {
            ClientIdGenerator::randomized(
                self.broker.client_id_multiplier,
                self.broker.client_id_offset_range,
            )
        } else {
            ClientIdGenerator::deterministic(self.broker.client_id_multiplier)
        };

        let config =
            SessionConfig::new(self.broker.host.clone(), self.broker.port).with_generator(generator);
        match self.broker.client_id {
            Some(id) => config.with_client_id(ClientId::new(id)),
            None => config,
        }
    }

    /// HTTP bind address as `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Broker gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Broker gateway host.
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// Broker gateway port.
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Fixed client id; generated per session when absent.
    #[serde(default)]
    pub client_id: Option<i64>,
    /// Multiplier giving each process its own id range.
    #[serde(default = "default_client_id_multiplier")]
    pub client_id_multiplier: i64,
    /// Exclusive upper bound of the randomized offset.
    #[serde(default = "default_client_id_offset_range")]
    pub client_id_offset_range: i64,
    /// Randomize the offset; when false every session uses `pid * multiplier`.
    #[serde(default = "default_true")]
    pub randomize_client_id: bool,
    /// Scheme used to reach the broker bridge.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Per-call timeout towards the broker bridge, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BrokerSettings {
    /// Per-call timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            client_id: None,
            client_id_multiplier: default_client_id_multiplier(),
            client_id_offset_range: default_client_id_offset_range(),
            randomize_client_id: true,
            scheme: default_scheme(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_broker_host() -> String {
    "127.0.0.1".to_string()
}
const fn default_broker_port() -> u16 {
    7497
}
const fn default_client_id_multiplier() -> i64 {
    DEFAULT_MULTIPLIER
}
const fn default_client_id_offset_range() -> i64 {
    DEFAULT_OFFSET_RANGE
}
fn default_scheme() -> String {
    "http".to_string()
}
const fn default_request_timeout_secs() -> u64 {
    30
}
const fn default_true() -> bool {
    true
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind host.
    #[serde(default = "default_http_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Service title reported by `/health`.
    #[serde(default = "default_title")]
    pub title: String,
    /// Service description.
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            title: default_title(),
            description: default_description(),
        }
    }
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}
const fn default_http_port() -> u16 {
    8000
}
fn default_title() -> String {
    "Market Data Gateway".to_string()
}
fn default_description() -> String {
    "HTTP gateway for historical market data from a broker terminal".to_string()
}

/// Defaults applied to optional `/histMktData` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// Lookback duration.
    #[serde(default = "default_duration")]
    pub duration: String,
    /// Bar size.
    #[serde(default = "default_bar_size")]
    pub bar_size: String,
    /// Data kind.
    #[serde(default = "default_what_to_show")]
    pub what_to_show: String,
    /// Regular trading hours only.
    #[serde(default = "default_true")]
    pub use_rth: bool,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            bar_size: default_bar_size(),
            what_to_show: default_what_to_show(),
            use_rth: true,
        }
    }
}

fn default_duration() -> String {
    "1 D".to_string()
}
fn default_bar_size() -> String {
    "1 min".to_string()
}
fn default_what_to_show() -> String {
    "TRADES".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// OpenTelemetry export.
    #[serde(default)]
    pub otel: OtelSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// OpenTelemetry export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtelSettings {
    /// Export spans over OTLP.
    #[serde(default)]
    pub enabled: bool,
    /// OTLP gRPC endpoint.
    #[serde(default = "default_otlp_endpoint")]
    pub endpoint: String,
    /// Service name attached to spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for OtelSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
        }
    }
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}
fn default_service_name() -> String {
    "market-data-gateway".to_string()
}

// ============================================
// Configuration Loading
// ============================================

/// Load settings from a YAML file, apply environment overrides and validate.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to `config.yaml`.
///   Relative paths are resolved against the working directory and then the
///   executable's directory.
///
/// # Errors
///
/// Returns a `ConfigError` if the file is missing, unreadable, malformed, or
/// fails validation.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = resolve_resource_path(path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE)));
    if !path.is_file() {
        return Err(ConfigError::NotFound { path });
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    let mut settings = parse_settings(&contents)?;
    apply_env_overrides(&mut settings)?;
    normalize(&mut settings);
    validate_settings(&settings)?;

    tracing::debug!(path = %path.display(), "Loaded settings");
    Ok(settings)
}

/// Load settings from a YAML string without environment overrides.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_settings_from_string(yaml: &str) -> Result<Settings, ConfigError> {
    let mut settings = parse_settings(yaml)?;
    normalize(&mut settings);
    validate_settings(&settings)?;
    Ok(settings)
}

fn parse_settings(yaml: &str) -> Result<Settings, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    Ok(serde_yaml_bw::from_str(&interpolated)?)
}

/// Apply `GATEWAY_*` overrides from the process environment.
///
/// # Errors
///
/// Returns `ConfigError::InvalidOverride` if a numeric override does not parse.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<(), ConfigError> {
    apply_overrides_from(settings, |name| std::env::var(name).ok())
}

/// Apply `GATEWAY_*` overrides read through `lookup`. Empty values are ignored.
///
/// # Errors
///
/// Returns `ConfigError::InvalidOverride` if a numeric override does not parse.
pub fn apply_overrides_from<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = get("GATEWAY_BROKER_HOST") {
        settings.broker.host = host;
    }
    if let Some(port) = get("GATEWAY_BROKER_PORT") {
        settings.broker.port = parse_override("GATEWAY_BROKER_PORT", &port)?;
    }
    if let Some(id) = get("GATEWAY_CLIENT_ID") {
        settings.broker.client_id = Some(parse_override("GATEWAY_CLIENT_ID", &id)?);
    }
    if let Some(host) = get("GATEWAY_HTTP_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = get("GATEWAY_HTTP_PORT") {
        settings.server.port = parse_override("GATEWAY_HTTP_PORT", &port)?;
    }
    if let Some(level) = get("GATEWAY_LOG_LEVEL") {
        settings.observability.logging.level = level;
    }
    Ok(())
}

fn parse_override<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            var,
            value: value.to_string(),
        })
}

fn normalize(settings: &mut Settings) {
    let logging = &mut settings.observability.logging;
    logging.level = logging.level.trim().to_lowercase();
    logging.format = logging.format.trim().to_lowercase();
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` naming the first offending field.
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let broker = &settings.broker;
    if broker.host.trim().is_empty() {
        return Err(invalid("broker.host must not be empty"));
    }
    if broker.port == 0 {
        return Err(invalid("broker.port must be non-zero"));
    }
    if broker.client_id_multiplier <= 0 {
        return Err(invalid("broker.client_id_multiplier must be positive"));
    }
    if broker.randomize_client_id && broker.client_id_offset_range <= 1 {
        return Err(invalid(
            "broker.client_id_offset_range must be greater than 1 when randomize_client_id is set",
        ));
    }
    if !matches!(broker.scheme.as_str(), "http" | "https") {
        return Err(invalid("broker.scheme must be http or https"));
    }
    if broker.request_timeout_secs == 0 {
        return Err(invalid("broker.request_timeout_secs must be non-zero"));
    }

    if settings.server.port == 0 {
        return Err(invalid("server.port must be non-zero"));
    }

    let defaults = &settings.defaults;
    for (name, value) in [
        ("defaults.duration", &defaults.duration),
        ("defaults.bar_size", &defaults.bar_size),
        ("defaults.what_to_show", &defaults.what_to_show),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(format!("{name} must not be empty")));
        }
    }

    let logging = &settings.observability.logging;
    if !LOG_LEVELS.contains(&logging.level.as_str()) {
        return Err(invalid(format!(
            "observability.logging.level must be one of: {LOG_LEVELS:?}"
        )));
    }
    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(invalid(format!(
            "observability.logging.format must be one of: {LOG_FORMATS:?}"
        )));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::domain::OffsetPolicy;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.broker.host, "127.0.0.1");
        assert_eq!(settings.broker.port, 7497);
        assert_eq!(settings.broker.client_id, None);
        assert_eq!(settings.broker.client_id_multiplier, 100);
        assert_eq!(settings.broker.client_id_offset_range, 50);
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.defaults.duration, "1 D");
        assert_eq!(settings.defaults.bar_size, "1 min");
        assert_eq!(settings.defaults.what_to_show, "TRADES");
        assert!(settings.defaults.use_rth);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let yaml = r"
broker:
  host: 10.1.2.3
  port: 4002
defaults:
  bar_size: 5 mins
";
        let settings = match load_settings_from_string(yaml) {
            Ok(s) => s,
            Err(e) => panic!("should load partial config: {e}"),
        };

        assert_eq!(settings.broker.host, "10.1.2.3");
        assert_eq!(settings.broker.port, 4002);
        assert_eq!(settings.defaults.bar_size, "5 mins");
        assert_eq!(settings.defaults.duration, "1 D");
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_log_level_is_lowercased() {
        let yaml = r"
observability:
  logging:
    level: DEBUG
";
        let settings = load_settings_from_string(yaml).unwrap();
        assert_eq!(settings.observability.logging.level, "debug");
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let yaml = r"
observability:
  logging:
    level: verbose
";
        assert!(matches!(
            load_settings_from_string(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_degenerate_offset_range_rejected_only_when_randomized() {
        let randomized = r"
broker:
  client_id_offset_range: 1
";
        assert!(load_settings_from_string(randomized).is_err());

        let deterministic = r"
broker:
  client_id_offset_range: 1
  randomize_client_id: false
";
        assert!(load_settings_from_string(deterministic).is_ok());
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "host: ${GATEWAY_SETTINGS_TEST_NONEXISTENT_VAR:-10.0.0.1}";
        assert_eq!(interpolate_env_vars(input), "host: 10.0.0.1");
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "host: ${GATEWAY_SETTINGS_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "host: ");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax
    fn test_env_var_uses_existing_value() {
        let result = interpolate_env_vars("path: ${PATH:-default}");
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_overrides_apply_over_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GATEWAY_BROKER_HOST", "broker.internal"),
            ("GATEWAY_BROKER_PORT", "4001"),
            ("GATEWAY_CLIENT_ID", "12"),
            ("GATEWAY_HTTP_PORT", "9000"),
            ("GATEWAY_LOG_LEVEL", "WARN"),
            ("GATEWAY_HTTP_HOST", ""),
        ]);
        let mut settings = Settings::default();

        apply_overrides_from(&mut settings, |k| vars.get(k).map(ToString::to_string)).unwrap();
        normalize(&mut settings);

        assert_eq!(settings.broker.host, "broker.internal");
        assert_eq!(settings.broker.port, 4001);
        assert_eq!(settings.broker.client_id, Some(12));
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.observability.logging.level, "warn");
    }

    #[test]
    fn test_unparseable_override_is_an_error() {
        let mut settings = Settings::default();
        let result = apply_overrides_from(&mut settings, |k| {
            (k == "GATEWAY_BROKER_PORT").then(|| "seventy".to_string())
        });

        assert!(matches!(
            result,
            Err(ConfigError::InvalidOverride {
                var: "GATEWAY_BROKER_PORT",
                ..
            })
        ));
    }

    #[test]
    fn test_session_config_from_settings() {
        let mut settings = Settings::default();
        settings.broker.randomize_client_id = false;
        settings.broker.client_id_multiplier = 10;

        let session = settings.session_config();
        assert_eq!(session.client_id, None);
        assert_eq!(session.generator.policy(), OffsetPolicy::Deterministic);

        settings.broker.client_id = Some(5);
        assert_eq!(settings.session_config().client_id, Some(ClientId::new(5)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(matches!(
            load_settings(Some(&path)),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 8123\n  title: Test Gateway").unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.server.port, 8123);
        assert_eq!(settings.server.title, "Test Gateway");
    }
}
