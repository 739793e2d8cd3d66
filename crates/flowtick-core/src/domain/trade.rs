use serde::{Deserialize, Deserializer};

/// Composite upstream identifier of a flow event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTradeId {
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub creation_time: String,
}

/// One flow event as the upstream endpoint reports it.
///
/// Missing and `null` fields decode to their zero value; a field with the
/// wrong JSON type fails the whole response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTradeRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub id: RawTradeId,
    #[serde(deserialize_with = "null_as_default")]
    pub order: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub created_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub trade_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub details: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bid_ask: String,
    #[serde(deserialize_with = "null_as_default")]
    pub contract_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub volume: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub call_put: String,
    #[serde(deserialize_with = "null_as_default")]
    pub strike: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub spot: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub premium: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub expiration: String,
    #[serde(deserialize_with = "null_as_default")]
    pub color: String,
    #[serde(deserialize_with = "null_as_default")]
    pub implied_volatility: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub dte: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub er: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stock_etf: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sector: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uoa: String,
    #[serde(deserialize_with = "null_as_default")]
    pub weekly: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mkt_cap: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub oi: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub itm: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub ex: i64,
}

impl RawTradeRecord {
    /// Natural key `"{timestamp}_{creationTime}"`.
    pub fn trade_id(&self) -> String {
        trade_id(self.id.timestamp, &self.id.creation_time)
    }
}

/// Natural key of a flow event; depends on nothing but its two inputs.
pub fn trade_id(timestamp: i64, creation_time: &str) -> String {
    format!("{timestamp}_{creation_time}")
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
