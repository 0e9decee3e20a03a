//! Instrument descriptors.
//!
//! A symbol on its own is ambiguous; the broker identifies a tradable
//! contract by the symbol/security-type/exchange/currency tuple. Requests
//! start from an under-specified stock descriptor and are canonicalized
//! (qualified) by the broker before bars are requested.

use serde::{Deserialize, Serialize};

/// Security type used for symbol lookups.
pub const DEFAULT_SECURITY_TYPE: &str = "STK";

/// Smart-routed exchange used for symbol lookups.
pub const DEFAULT_EXCHANGE: &str = "SMART";

/// Currency used for symbol lookups.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Instrument descriptor identifying a tradable contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker symbol (e.g., "AAPL").
    pub symbol: String,
    /// Security type (e.g., "STK").
    #[serde(default = "default_security_type")]
    pub security_type: String,
    /// Routing exchange (e.g., "SMART").
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Settlement currency (e.g., "USD").
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Broker contract id, set once the descriptor is qualified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub con_id: Option<i64>,
    /// Primary listing exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_exchange: Option<String>,
    /// Exchange-local symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_symbol: Option<String>,
}

impl Instrument {
    /// Smart-routed USD stock descriptor for a symbol.
    #[must_use]
    pub fn stock(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            security_type: default_security_type(),
            exchange: default_exchange(),
            currency: default_currency(),
            con_id: None,
            primary_exchange: None,
            local_symbol: None,
        }
    }

    /// Whether the descriptor can be sent to the broker for qualification.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.symbol.trim().is_empty()
    }
}

/// One candidate returned by a contract-details lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDetails {
    /// Embedded descriptor. Brokers occasionally return details without one.
    #[serde(default)]
    pub contract: Option<Instrument>,
    /// Descriptive name (e.g., "APPLE INC").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    /// Minimum price increment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tick: Option<f64>,
}

impl ContractDetails {
    /// Details wrapping a descriptor.
    #[must_use]
    pub const fn for_contract(contract: Instrument) -> Self {
        Self {
            contract: Some(contract),
            long_name: None,
            min_tick: None,
        }
    }

    /// The embedded descriptor, if present and usable.
    #[must_use]
    pub fn usable_contract(&self) -> Option<&Instrument> {
        self.contract.as_ref().filter(|c| c.is_usable())
    }
}

fn default_security_type() -> String {
    DEFAULT_SECURITY_TYPE.to_string()
}

fn default_exchange() -> String {
    DEFAULT_EXCHANGE.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
