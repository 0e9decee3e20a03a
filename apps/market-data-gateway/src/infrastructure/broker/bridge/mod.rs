//! Broker Bridge Adapter
//!
//! Implementation of `BrokerConnector` for a broker bridge speaking JSON over
//! HTTP. One bridge session corresponds to one broker client id:
//! - `POST /v1/sessions` opens the session (handshake)
//! - `GET /v1/sessions/{id}` reports liveness
//! - `DELETE /v1/sessions/{id}` tears it down
//! - `POST /v1/sessions/{id}/{contract-details,qualify,historical-data}`
//!
//! Calls are never retried; a failed request fails the gateway request.

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::{BridgeConnection, BridgeConnector};
pub use config::BridgeConfig;
pub use error::BridgeError;
