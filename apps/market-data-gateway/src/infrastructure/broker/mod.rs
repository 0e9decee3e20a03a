//! Broker adapters.
//!
//! Outbound adapters implementing the broker ports.

pub mod bridge;

pub use bridge::{BridgeConfig, BridgeConnection, BridgeConnector, BridgeError};
