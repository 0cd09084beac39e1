use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::address::canonical_id;

/// One row of the holders endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub address: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub token_amount: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub value_usd: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub ownership_percentage: f64,
    #[serde(default)]
    pub address_label: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub total_inflow: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub total_outflow: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance_change_24h: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance_change_7d: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance_change_30d: f64,
}

impl HolderRecord {
    pub fn new(address: impl Into<String>, token_amount: f64) -> Self {
        Self {
            address: address.into(),
            token_amount,
            value_usd: 0.0,
            ownership_percentage: 0.0,
            address_label: None,
            total_inflow: 0.0,
            total_outflow: 0.0,
            balance_change_24h: 0.0,
            balance_change_7d: 0.0,
            balance_change_30d: 0.0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.address_label = Some(label.into());
        self
    }

    pub fn id(&self) -> String {
        canonical_id(&self.address)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub is_last_page: bool,
}

/// Body of a successful holders response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HoldersPage {
    pub data: Vec<HolderRecord>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// A counterparty as reshaped by the proxy.
///
/// `interactingAddress`, `volIn` and `volOut` are the only accepted names. Rows that come
/// in with legacy aliases are dropped by [`parse_counterparties`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Counterparty {
    #[serde(rename = "interactingAddress")]
    pub interacting_address: String,
    #[serde(rename = "interactingLabel", default)]
    pub interacting_label: Option<String>,
    #[serde(rename = "volIn", default, deserialize_with = "flexible_f64")]
    pub vol_in: f64,
    #[serde(rename = "volOut", default, deserialize_with = "flexible_f64")]
    pub vol_out: f64,
    #[serde(rename = "interactionCount", default)]
    pub interaction_count: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct CounterpartiesPage {
    pub counterparties: Vec<Counterparty>,
    pub pagination: Option<Pagination>,
}

/// Holder-to-holder relation discovered by the fetcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionEdge {
    pub source: String,
    pub target: String,
    pub volume_in: f64,
    pub volume_out: f64,
    pub total_volume: f64,
}

impl InteractionEdge {
    pub fn new(source: &str, target: &str, volume_in: f64, volume_out: f64) -> Self {
        Self {
            source: canonical_id(source),
            target: canonical_id(target),
            volume_in,
            volume_out,
            total_volume: volume_in.abs() + volume_out.abs(),
        }
    }
}

/// A single transfer between two addresses, used when a link is expanded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<String>,
    #[serde(rename = "blockTimestamp", default)]
    pub block_timestamp: Option<String>,
    #[serde(rename = "volumeUsd", default, deserialize_with = "flexible_f64")]
    pub volume_usd: f64,
    #[serde(rename = "tokenSymbol", default)]
    pub token_symbol: Option<String>,
}

/// Error envelope returned by the proxy on non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: Value,
}

impl ErrorBody {
    pub(crate) fn message(&self) -> String {
        match &self.error {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Parses the counterparties envelope, keeping only rows that match the schema.
pub fn parse_counterparties(body: &Value) -> Result<CounterpartiesPage, String> {
    let object = body
        .as_object()
        .ok_or_else(|| "expected an object with a `counterparties` array".to_owned())?;
    let rows = object
        .get("counterparties")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing `counterparties` array".to_owned())?;

    let mut counterparties = Vec::with_capacity(rows.len());
    for row in rows {
        match Counterparty::deserialize(row) {
            Ok(counterparty) => counterparties.push(counterparty),
            Err(error) => warn!(%error, "dropping counterparty row with unexpected shape"),
        }
    }

    let pagination = object
        .get("pagination")
        .and_then(|value| Pagination::deserialize(value).ok());

    Ok(CounterpartiesPage {
        counterparties,
        pagination,
    })
}

/// Parses the transactions envelope (`{ "data": [...] }`).
pub fn parse_transactions(body: &Value) -> Result<Vec<Transaction>, String> {
    let rows = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing `data` array".to_owned())?;

    Ok(rows
        .iter()
        .filter_map(|row| match Transaction::deserialize(row) {
            Ok(transaction) => Some(transaction),
            Err(error) => {
                warn!(%error, "dropping transaction row with unexpected shape");
                None
            }
        })
        .collect())
}

/// Accepts numbers, numeric strings and null; the proxy emits volumes as strings.
fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(number)) => Ok(number.as_f64().unwrap_or(0.0)),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(0.0),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {text}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn holder_amounts_accept_strings_and_missing_fields() {
        let holder: HolderRecord = serde_json::from_value(json!({
            "address": "0xAbC",
            "token_amount": "1500.5",
            "value_usd": 20,
            "address_label": "Binance 🏦"
        }))
        .expect("valid holder");

        assert_eq!(holder.token_amount, 1500.5);
        assert_eq!(holder.value_usd, 20.0);
        assert_eq!(holder.ownership_percentage, 0.0);
        assert_eq!(holder.id(), "0xabc");
    }

    #[test]
    fn counterparties_keep_only_authoritative_rows() {
        let page = parse_counterparties(&json!({
            "counterparties": [
                { "interactingAddress": "B", "volIn": "10", "volOut": "5" },
                { "address": "C", "volIn": "1" }
            ],
            "pagination": { "page": 1, "per_page": 100, "is_last_page": true }
        }))
        .expect("envelope");

        assert_eq!(page.counterparties.len(), 1);
        assert_eq!(page.counterparties[0].vol_in, 10.0);
        assert_eq!(page.counterparties[0].vol_out, 5.0);
        assert!(page.pagination.is_some_and(|p| p.is_last_page));
    }

    #[test]
    fn bare_counterparty_array_is_rejected() {
        assert!(parse_counterparties(&json!([{ "interactingAddress": "B" }])).is_err());
    }

    #[test]
    fn edge_total_is_sum_of_magnitudes() {
        let edge = InteractionEdge::new("A", "B", 10.0, -5.0);
        assert_eq!(edge.source, "a");
        assert_eq!(edge.total_volume, 15.0);
    }
}
