//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod fetch_historical_bars;

pub use fetch_historical_bars::FetchHistoricalBarsUseCase;
