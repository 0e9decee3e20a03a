//! Domain Layer - Instruments, bars and session identity.
//!
//! Pure types with serialization support. Nothing here performs I/O.

/// Historical bar requests and the opaque bar field map.
pub mod bar;

/// Per-connection client identifier generation.
pub mod client_id;

/// Instrument descriptors and contract details.
pub mod instrument;

/// Lifecycle stages of a single historical-data request.
pub mod stage;

pub use bar::{Bar, BarQuery, HistoricalBarRequest};
pub use client_id::{ClientId, ClientIdGenerator, OffsetPolicy};
pub use instrument::{ContractDetails, Instrument};
pub use stage::RequestStage;
