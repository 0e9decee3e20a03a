//! Request lifecycle stages.
//!
//! A historical-data request moves linearly through these stages. Any stage
//! after `Validating` may fail; once `Connecting` has succeeded the request
//! still passes through `Disconnecting` on the way to the error response.

use serde::Serialize;

/// Stage of a single historical-data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    /// Checking query parameters.
    Validating,
    /// Opening the broker session.
    Connecting,
    /// Looking up contract details for the symbol.
    Resolving,
    /// Canonicalizing the candidate descriptor.
    Qualifying,
    /// Requesting historical bars.
    Fetching,
    /// Releasing the broker session.
    Disconnecting,
    /// Converting bars into the response body.
    Serializing,
    /// Writing the HTTP response.
    Responding,
}

impl RequestStage {
    /// Stable lowercase name for logs and error context.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Connecting => "connecting",
            Self::Resolving => "resolving",
            Self::Qualifying => "qualifying",
            Self::Fetching => "fetching",
            Self::Disconnecting => "disconnecting",
            Self::Serializing => "serializing",
            Self::Responding => "responding",
        }
    }
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
