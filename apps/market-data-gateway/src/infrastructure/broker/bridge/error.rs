//! Bridge-specific error types.

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the bridge adapter.
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    /// Client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Request never produced a response (refused, reset, timed out).
    #[error("Broker bridge unreachable: {0}")]
    Network(String),

    /// Bridge answered with a non-2xx status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the bridge.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("Malformed bridge response: {0}")]
    JsonParse(String),

    /// Handshake was answered but the session is not live.
    #[error("Broker rejected session for client id {client_id}")]
    SessionRejected {
        /// Client id of the rejected session.
        client_id: i64,
    },
}

impl BridgeError {
    /// Map a failure during the handshake: every cause is a connection failure.
    #[must_use]
    pub fn into_connection_error(self) -> BrokerError {
        BrokerError::connection(self.to_string())
    }
}

impl From<BridgeError> for BrokerError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Client(_) | BridgeError::Network(_) | BridgeError::SessionRejected { .. } => {
                Self::connection(err.to_string())
            }
            BridgeError::Api { message, .. } => Self::operation(message),
            BridgeError::JsonParse(_) => Self::protocol(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_bridge_message_verbatim() {
        let err = BridgeError::Api {
            status: 422,
            message: "No security definition has been found".to_string(),
        };
        let broker_err: BrokerError = err.into();
        assert!(matches!(broker_err, BrokerError::Operation { .. }));
        assert_eq!(broker_err.to_string(), "No security definition has been found");
    }

    #[test]
    fn network_error_is_connection_error() {
        let broker_err: BrokerError = BridgeError::Network("connection refused".to_string()).into();
        assert!(matches!(broker_err, BrokerError::Connection { .. }));
        assert!(broker_err.to_string().contains("connection refused"));
    }

    #[test]
    fn malformed_body_is_protocol_error() {
        let broker_err: BrokerError = BridgeError::JsonParse("expected array".to_string()).into();
        assert!(matches!(broker_err, BrokerError::Protocol { .. }));
    }

    #[test]
    fn handshake_failures_are_always_connection_errors() {
        let err = BridgeError::Api {
            status: 503,
            message: "terminal not logged in".to_string(),
        };
        let broker_err = err.into_connection_error();
        assert!(matches!(broker_err, BrokerError::Connection { .. }));
        assert!(broker_err.to_string().contains("terminal not logged in"));
    }
}
