//! HTTP response DTOs.

use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service title.
    pub service: String,
    /// Service description.
    pub description: String,
    /// Service version.
    pub version: String,
    /// Seconds since start-up.
    pub uptime_secs: u64,
    /// Current server time.
    pub current_time: DateTime<Utc>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_http_response())).into_response()
    }
}
