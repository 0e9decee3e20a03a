//! Bridge client configuration.

use std::time::Duration;

use crate::infrastructure::config::BrokerSettings;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the bridge HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// URL scheme (`http` or `https`).
    pub scheme: String,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl BridgeConfig {
    /// Create a config with an explicit scheme and timeout.
    #[must_use]
    pub fn new(scheme: impl Into<String>, timeout: Duration) -> Self {
        Self {
            scheme: scheme.into(),
            timeout,
        }
    }

    /// Base URL of the bridge listening on `host:port`.
    #[must_use]
    pub fn base_url(&self, host: &str, port: u16) -> String {
        format!("{}://{host}:{port}", self.scheme)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new("http", DEFAULT_TIMEOUT)
    }
}

impl From<&BrokerSettings> for BridgeConfig {
    fn from(settings: &BrokerSettings) -> Self {
        Self::new(settings.scheme.clone(), settings.request_timeout())
    }
}
