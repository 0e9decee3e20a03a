// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Market Data Gateway - Rust Core Library
//!
//! HTTP gateway exposing historical bars from a broker terminal. Each
//! request opens its own broker session, resolves the requested symbol to a
//! qualified contract, fetches bars and closes the session before replying.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Instruments, bars, client ids, request stages
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `BrokerConnector` / `BrokerConnection`
//!   - `services`: `SessionManager` (connection-scoped sessions)
//!   - `use_cases`: `FetchHistoricalBars`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker`: Broker bridge adapter
//!   - `http`: `GET /histMktData`, health and metrics endpoints
//!   - `config`, `telemetry`, `metrics`, `resources`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Gateway error taxonomy and HTTP mapping.
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{BrokerConnection, BrokerConnector, BrokerError, ConnectionInfo};
pub use application::services::{Session, SessionConfig, SessionManager};
pub use application::use_cases::FetchHistoricalBarsUseCase;
pub use domain::{Bar, BarQuery, ClientId, ClientIdGenerator, HistoricalBarRequest, Instrument};
pub use error::{ErrorCode, GatewayError};
