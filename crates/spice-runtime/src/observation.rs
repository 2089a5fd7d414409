use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One timestamped record of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub values: IndexMap<String, f64>,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: IndexMap::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: f64) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    /// Prefix every field that is not already under `prefix.`.
    pub fn qualified(self, prefix: &str) -> Self {
        let scope = format!("{prefix}.");
        let values = self
            .values
            .into_iter()
            .map(|(field, value)| {
                if field.starts_with(&scope) {
                    (field, value)
                } else {
                    (format!("{scope}{field}"), value)
                }
            })
            .collect();
        Self {
            timestamp: self.timestamp,
            values,
        }
    }
}

/// Provenance of an ingested batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Caller-supplied records, validated against the field registry.
    Local,
    /// Records from the named data-source group, trusted as-is.
    Fetched(String),
}

/// One granularity bucket in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub timestamp: DateTime<Utc>,
    pub values: IndexMap<String, f64>,
}

/// Decode a JSON array of observations.
pub fn observations_from_json(bytes: &[u8]) -> Result<Vec<Observation>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualification_is_idempotent() {
        let ts = DateTime::from_timestamp(1_605_312_000, 0).unwrap();
        let obs = Observation::new(ts)
            .with_value("price", 16_000.0)
            .with_value("coinbase.btcusd.ask", 16_001.0)
            .qualified("coinbase.btcusd");
        let fields: Vec<_> = obs.values.keys().map(String::as_str).collect();
        assert_eq!(fields, ["coinbase.btcusd.price", "coinbase.btcusd.ask"]);
        assert_eq!(obs.clone().qualified("coinbase.btcusd"), obs);
    }

    #[test]
    fn json_keeps_document_field_order() {
        let batch = observations_from_json(
            br#"[{"timestamp": "2020-11-14T00:00:05Z",
                  "values": {"local.portfolio.usd_balance": 100.0, "coinbase.btcusd.price": 16000.5}}]"#,
        )
        .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].timestamp.timestamp(), 1_605_312_005);
        let fields: Vec<_> = batch[0].values.keys().map(String::as_str).collect();
        assert_eq!(fields, ["local.portfolio.usd_balance", "coinbase.btcusd.price"]);
    }
}
