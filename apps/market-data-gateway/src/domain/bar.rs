//! Historical bar requests and bars.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::instrument::Instrument;

/// Date format flag asking the broker for formatted date strings.
pub const FORMAT_DATE_STRING: u8 = 1;

/// One observation returned by the broker.
///
/// The gateway does not interpret bar contents: a bar is an ordered field
/// map passed through verbatim, in the order the broker produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bar(Map<String, Value>);

impl Bar {
    /// Build a bar from `(field, value)` pairs, keeping their order.
    #[must_use]
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field names in broker order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bar carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying field map.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Bar {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Validated query for historical bars, before instrument resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarQuery {
    /// Symbol to resolve.
    pub symbol: String,
    /// End of the requested window; empty means "now" to the broker.
    pub end_date_time: String,
    /// Lookback duration in broker grammar (e.g., "1 D").
    pub duration: String,
    /// Bar size in broker grammar (e.g., "1 min").
    pub bar_size: String,
    /// Data kind (e.g., "TRADES").
    pub what_to_show: String,
    /// Restrict to regular trading hours.
    pub use_rth: bool,
}

/// Historical-data request sent to the broker for a qualified instrument.
///
/// Immutable once built; every string field is forwarded unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalBarRequest {
    contract: Instrument,
    end_date_time: String,
    duration: String,
    bar_size: String,
    what_to_show: String,
    use_rth: bool,
    format_date: u8,
}

impl HistoricalBarRequest {
    /// Bind a validated query to a qualified instrument.
    #[must_use]
    pub fn new(contract: Instrument, query: &BarQuery) -> Self {
        Self {
            contract,
            end_date_time: query.end_date_time.clone(),
            duration: query.duration.clone(),
            bar_size: query.bar_size.clone(),
            what_to_show: query.what_to_show.clone(),
            use_rth: query.use_rth,
            format_date: FORMAT_DATE_STRING,
        }
    }

    /// Qualified instrument.
    #[must_use]
    pub const fn contract(&self) -> &Instrument {
        &self.contract
    }

    /// End date/time, empty for "now".
    #[must_use]
    pub fn end_date_time(&self) -> &str {
        &self.end_date_time
    }

    /// Duration string.
    #[must_use]
    pub fn duration(&self) -> &str {
        &self.duration
    }

    /// Bar size string.
    #[must_use]
    pub fn bar_size(&self) -> &str {
        &self.bar_size
    }

    /// Data kind.
    #[must_use]
    pub fn what_to_show(&self) -> &str {
        &self.what_to_show
    }

    /// Regular trading hours flag.
    #[must_use]
    pub const fn use_rth(&self) -> bool {
        self.use_rth
    }

    /// Date format flag.
    #[must_use]
    pub const fn format_date(&self) -> u8 {
        self.format_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> BarQuery {
        BarQuery {
            symbol: "AAPL".to_string(),
            end_date_time: String::new(),
            duration: "1 D".to_string(),
            bar_size: "1 min".to_string(),
            what_to_show: "TRADES".to_string(),
            use_rth: true,
        }
    }

    #[test]
    fn bar_keeps_broker_field_order() {
        let bar: Bar =
            serde_json::from_str(r#"{"date": "2024-07-10", "open": 100, "close": 110, "high": 111}"#)
                .unwrap();
        let names: Vec<&str> = bar.field_names().collect();
        assert_eq!(names, ["date", "open", "close", "high"]);
        assert_eq!(
            serde_json::to_string(&bar).unwrap(),
            r#"{"date":"2024-07-10","open":100,"close":110,"high":111}"#
        );
    }

    #[test]
    fn bar_from_fields() {
        let bar = Bar::from_fields([("volume", 42), ("open", 7)]);
        assert_eq!(bar.len(), 2);
        assert_eq!(bar.get("volume"), Some(&Value::from(42)));
        assert!(!bar.is_empty());
    }

    #[test]
    fn request_copies_query_fields_verbatim() {
        let mut q = query();
        q.end_date_time = "20240710 14:00:00".to_string();
        q.use_rth = false;

        let request = HistoricalBarRequest::new(Instrument::stock("AAPL"), &q);

        assert_eq!(request.end_date_time(), "20240710 14:00:00");
        assert_eq!(request.duration(), "1 D");
        assert_eq!(request.bar_size(), "1 min");
        assert_eq!(request.what_to_show(), "TRADES");
        assert!(!request.use_rth());
        assert_eq!(request.format_date(), FORMAT_DATE_STRING);
        assert_eq!(request.contract().symbol, "AAPL");
    }

    #[test]
    fn empty_end_date_time_serializes_as_empty_string() {
        let request = HistoricalBarRequest::new(Instrument::stock("AAPL"), &query());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["end_date_time"], Value::from(""));
        assert_eq!(json["use_rth"], Value::from(true));
    }
}
