//! Prometheus Metrics Module
//!
//! Exposes gateway metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Sessions**: Broker sessions opened, closed and failed releases
//! - **Connections**: Failed broker handshakes
//! - **Requests**: Historical-data requests by outcome and their latency
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "gateway_sessions_opened_total",
        "Broker sessions opened by a successful handshake"
    );
    describe_counter!(
        "gateway_sessions_closed_total",
        "Broker sessions released, including those already dropped by the broker"
    );
    describe_counter!(
        "gateway_session_release_failures_total",
        "Broker session teardowns that failed and were swallowed"
    );
    describe_counter!(
        "gateway_connection_failures_total",
        "Broker handshakes that failed"
    );
    describe_counter!(
        "gateway_requests_total",
        "Historical-data requests by outcome"
    );
    describe_histogram!(
        "gateway_request_duration_seconds",
        "End-to-end historical-data request latency"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a session opened.
pub fn record_session_opened() {
    counter!("gateway_sessions_opened_total").increment(1);
}

/// Record a session released.
pub fn record_session_closed() {
    counter!("gateway_sessions_closed_total").increment(1);
}

/// Record a failed session teardown.
pub fn record_release_failure() {
    counter!("gateway_session_release_failures_total").increment(1);
}

/// Record a failed broker handshake.
pub fn record_connection_failure() {
    counter!("gateway_connection_failures_total").increment(1);
}

/// Record a finished request and its latency.
///
/// `outcome` is `ok` or an error code reason.
pub fn record_request(outcome: &'static str, duration: Duration) {
    counter!("gateway_requests_total", "outcome" => outcome).increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_session_opened();
        record_session_closed();
        record_release_failure();
        record_connection_failure();
        record_request("ok", Duration::from_millis(5));
    }
}
