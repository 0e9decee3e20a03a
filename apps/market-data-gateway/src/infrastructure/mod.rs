//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer, plus the
//! process-level concerns the binary wires together:
//!
//! - **Driven Adapters (Outbound)**
//!   - `broker/`: Broker bridge adapter (HTTP/JSON)
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API controllers
//!
//! - **Cross-cutting**
//!   - `config/`: YAML settings and environment overrides
//!   - `resources/`: Bundled resource path resolution
//!   - `telemetry/`: Logging and OpenTelemetry tracing
//!   - `metrics/`: Prometheus metrics

pub mod broker;
pub mod config;
pub mod http;
pub mod metrics;
pub mod resources;
pub mod telemetry;
