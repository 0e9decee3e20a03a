//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::BarQuery;
use crate::error::GatewayError;
use crate::infrastructure::config::QueryDefaults;

/// Query parameters of `GET /histMktData`.
///
/// Every field is optional at the transport level so that a missing `symbol`
/// is reported by the gateway rather than by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistMktDataParams {
    /// Symbol to fetch (required).
    pub symbol: Option<String>,
    /// Lookback duration, e.g. `1 D`.
    pub duration: Option<String>,
    /// Bar size, e.g. `1 min`.
    pub bar_size: Option<String>,
    /// Data kind, e.g. `TRADES`.
    pub what_to_show: Option<String>,
    /// `true`/`false`/`1`/`0`.
    pub use_rth: Option<String>,
    /// End of the window in broker format; empty means now.
    pub end_datetime: Option<String>,
}

impl HistMktDataParams {
    /// Validate and apply defaults.
    ///
    /// Empty optional parameters are treated as absent.
    ///
    /// # Errors
    ///
    /// - `MISSING_PARAMETER` if `symbol` is absent or blank
    /// - `INVALID_PARAMETER` if `use_rth` is not a boolean
    pub fn into_query(self, defaults: &QueryDefaults) -> Result<BarQuery, GatewayError> {
        let symbol = self
            .symbol
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GatewayError::missing_parameter("symbol"))?;

        let use_rth = match non_empty(self.use_rth) {
            Some(raw) => parse_bool("use_rth", &raw)?,
            None => defaults.use_rth,
        };

        Ok(BarQuery {
            symbol,
            end_date_time: self.end_datetime.unwrap_or_default(),
            duration: non_empty(self.duration).unwrap_or_else(|| defaults.duration.clone()),
            bar_size: non_empty(self.bar_size).unwrap_or_else(|| defaults.bar_size.clone()),
            what_to_show: non_empty(self.what_to_show)
                .unwrap_or_else(|| defaults.what_to_show.clone()),
            use_rth,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, GatewayError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(GatewayError::invalid_parameter(
            name,
            raw,
            "one of true, false, 1, 0",
        )),
    }
}
