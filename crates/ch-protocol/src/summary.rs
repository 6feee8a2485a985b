//! The `x-clickhouse-summary` response header.

use serde::{Deserialize, Deserializer, de};

use crate::error::ProtocolError;

/// Progress counters the server reports once a query finishes.
///
/// The server sends every counter as a decimal string, for example
/// `{"read_rows":"0","written_rows":"1000"}`. Plain JSON numbers are
/// accepted too. Missing counters default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Summary {
    /// Rows read by the query.
    #[serde(deserialize_with = "counter")]
    pub read_rows: u64,
    /// Bytes read by the query.
    #[serde(deserialize_with = "counter")]
    pub read_bytes: u64,
    /// Rows written by an insert.
    #[serde(deserialize_with = "counter")]
    pub written_rows: u64,
    /// Bytes written by an insert.
    #[serde(deserialize_with = "counter")]
    pub written_bytes: u64,
    /// Estimated rows the query had to read.
    #[serde(deserialize_with = "counter")]
    pub total_rows_to_read: u64,
    /// Rows in the result.
    #[serde(deserialize_with = "counter")]
    pub result_rows: u64,
    /// Bytes in the result.
    #[serde(deserialize_with = "counter")]
    pub result_bytes: u64,
    /// Query wall time in nanoseconds.
    #[serde(deserialize_with = "counter")]
    pub elapsed_ns: u64,
}

impl Summary {
    /// Parse a header value.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::InvalidSummary(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Counter {
    Number(u64),
    Text(String),
}

fn counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Counter::deserialize(deserializer)? {
        Counter::Number(n) => Ok(n),
        Counter::Text(s) => s.parse().map_err(de::Error::custom),
    }
}
