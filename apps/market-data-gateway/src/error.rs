//! Structured error handling for the gateway.
//!
//! Every failure a request can hit is a [`GatewayError`] carrying an
//! [`ErrorCode`]. The code decides the HTTP status; the message is what the
//! caller sees. Context pairs (stage, symbol, client id) are for logs only.
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `MISSING_PARAMETER` | 400 | Required query parameter absent |
//! | `INVALID_PARAMETER` | 400 | Query parameter present but malformed |
//! | `INSTRUMENT_NOT_FOUND` | 404 | Symbol resolved to no usable contract |
//! | `CONNECTION_FAILED` | 500 | Broker handshake failed |
//! | `BROKER_OPERATION_FAILED` | 500 | Resolution, qualification or fetch failed |
//! | `INTERNAL_ERROR` | 500 | Anything else |

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::BrokerError;
use crate::domain::RequestStage;

/// Error codes reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (400)
    /// Required parameter missing.
    MissingParameter,
    /// Parameter could not be parsed.
    InvalidParameter,

    // Not found errors (404)
    /// No tradable instrument for the symbol.
    InstrumentNotFound,

    // Broker and internal errors (500)
    /// Broker handshake failed.
    ConnectionFailed,
    /// Broker operation failed on a live session.
    BrokerOperationFailed,
    /// Unexpected failure.
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter | Self::InvalidParameter => StatusCode::BAD_REQUEST,
            Self::InstrumentNotFound => StatusCode::NOT_FOUND,
            Self::ConnectionFailed | Self::BrokerOperationFailed | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Reason string reported in response bodies and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InstrumentNotFound => "INSTRUMENT_NOT_FOUND",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::BrokerOperationFailed => "BROKER_OPERATION_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is the caller's fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter | Self::InvalidParameter | Self::InstrumentNotFound
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A gateway error with log context.
#[derive(Debug, Error)]
pub struct GatewayError {
    code: ErrorCode,
    message: String,
    context: Vec<(String, String)>,
}

impl GatewayError {
    /// Create a new gateway error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Record the stage the request was in when it failed.
    #[must_use]
    pub fn at_stage(self, stage: RequestStage) -> Self {
        self.with_context("stage", stage.as_str())
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Look up a context value.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Convert to an HTTP error response body. Context is not included.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            error: self.message.clone(),
            code: self.code.reason().to_string(),
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

/// HTTP error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Error code string.
    pub code: String,
}

/// Convenience constructors for common errors.
impl GatewayError {
    /// Required query parameter missing.
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorCode::MissingParameter,
            format!("Missing required parameter '{name}'"),
        )
        .with_context("parameter", name)
    }

    /// Query parameter present but malformed.
    #[must_use]
    pub fn invalid_parameter(name: &str, value: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid value '{value}' for parameter '{name}': expected {expected}"),
        )
        .with_context("parameter", name)
    }

    /// Query string that cannot be decoded at all, such as a repeated field.
    #[must_use]
    pub fn malformed_query(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, detail)
    }

    /// No usable contract for a symbol.
    #[must_use]
    pub fn instrument_not_found(symbol: &str) -> Self {
        Self::new(
            ErrorCode::InstrumentNotFound,
            format!("No contract found for symbol '{symbol}'"),
        )
        .with_context("symbol", symbol)
    }

    /// Broker handshake failed.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConnectionFailed, message)
    }

    /// Broker operation failed.
    #[must_use]
    pub fn broker_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BrokerOperationFailed, message)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<BrokerError> for GatewayError {
    fn from(error: BrokerError) -> Self {
        match error {
            BrokerError::Connection { .. } => Self::connection(error.to_string()),
            BrokerError::Operation { .. } | BrokerError::Protocol { .. } => {
                Self::broker_operation(error.to_string())
            }
        }
    }
}
