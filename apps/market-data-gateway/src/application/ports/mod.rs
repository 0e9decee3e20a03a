//! Application Ports (Driven)
//!
//! Ports define how the gateway reaches external systems. The only one is
//! the broker gateway.

mod broker_port;

#[cfg(test)]
pub use broker_port::MockBrokerConnection;
pub use broker_port::{BrokerConnection, BrokerConnector, BrokerError, ConnectionInfo};
