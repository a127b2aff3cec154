use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// District sentinel for state-wide aggregates
pub const STATE_AVG_DISTRICT: &str = "__state_avg__";

/// Lowercase + trim, the canonical form of every key component
pub fn normalize_field(value: &str) -> String {
    value.trim().to_lowercase()
}

/// "uttar pradesh" -> "Uttar Pradesh"
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Cache / aggregation key. Components are normalized on construction so two keys
/// built from differently cased input compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceKey {
    pub state: String,
    pub district: String,
    pub commodity: String,
}

impl PriceKey {
    pub fn new(state: &str, district: &str, commodity: &str) -> Self {
        Self {
            state: normalize_field(state),
            district: normalize_field(district),
            commodity: normalize_field(commodity),
        }
    }

    pub fn state_average(state: &str, commodity: &str) -> Self {
        Self::new(state, STATE_AVG_DISTRICT, commodity)
    }

    pub fn is_state_average(&self) -> bool {
        self.district == STATE_AVG_DISTRICT
    }
}

/// One market observation as reported by data.gov.in (or a row of the bulk dataset).
///
/// Field names are accepted in the API's lowercase form and in the capitalized
/// variants older exports use. Unknown fields are kept in `extra` so a snapshot
/// written to disk carries the upstream payload verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    #[serde(default, alias = "State", deserialize_with = "lenient_string")]
    pub state: String,

    #[serde(default, alias = "District", deserialize_with = "lenient_string")]
    pub district: String,

    #[serde(default, alias = "Market", deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,

    #[serde(default, alias = "Commodity", deserialize_with = "lenient_string")]
    pub commodity: String,

    #[serde(default, alias = "Variety", deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,

    // String in the current API, number in some exports
    #[serde(default, alias = "Modal Price", alias = "Modal_Price")]
    pub modal_price: Value,

    #[serde(default, alias = "Arrival_Date", alias = "Arrival Date", deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawPriceRecord {
    pub fn new(
        state: impl Into<String>,
        district: impl Into<String>,
        commodity: impl Into<String>,
        modal_price: f64,
        arrival_date: Option<String>,
    ) -> Self {
        Self {
            state: state.into(),
            district: district.into(),
            market: None,
            commodity: commodity.into(),
            variety: None,
            modal_price: Value::String(modal_price.to_string()),
            arrival_date,
            extra: Map::new(),
        }
    }

    /// Numeric modal price, `None` when missing or not a finite non-negative number
    pub fn modal_price_value(&self) -> Option<f64> {
        let parsed = match &self.modal_price {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|price| price.is_finite() && *price >= 0.0)
    }
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

/// Which tier produced a `PriceResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceTier {
    DiskCache,
    Live,
    Historical,
    HistoricalStateAverage,
    NotFound,
}

/// Resolver output. Built once per resolution and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub price: Option<i64>,
    pub note: String,
    pub is_stale: bool,
    pub stale_date: Option<String>,
    pub source: PriceTier,
}

impl PriceResult {
    pub fn fresh(price: i64, note: String, source: PriceTier) -> Self {
        Self { price: Some(price), note, is_stale: false, stale_date: None, source }
    }

    pub fn stale(price: i64, note: String, stale_date: String, source: PriceTier) -> Self {
        Self { price: Some(price), note, is_stale: true, stale_date: Some(stale_date), source }
    }

    pub fn not_found(note: String) -> Self {
        Self { price: None, note, is_stale: false, stale_date: None, source: PriceTier::NotFound }
    }

    pub fn is_found(&self) -> bool {
        self.price.is_some()
    }
}
