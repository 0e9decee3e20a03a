//! Bridge request and response types.
//!
//! Instruments, contract details, bar requests and bars travel in their
//! domain serde form; only the session envelope is bridge-specific.

use serde::{Deserialize, Serialize};

use crate::domain::ClientId;

/// Handshake body of `POST /v1/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct OpenSessionRequest {
    /// Client id the session is registered under.
    pub client_id: ClientId,
}

/// Session state returned by the handshake and the liveness probe.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    /// Whether the bridge holds a live broker session.
    #[serde(default)]
    pub connected: bool,
    /// Broker server version, when the bridge reports it.
    #[serde(default)]
    pub server_version: Option<i32>,
}

/// Error body returned by the bridge on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
