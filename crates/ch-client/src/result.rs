//! Call results.

use bytes::Bytes;
use ch_protocol::Summary;

use crate::decode::Row;

/// Rows returned by a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    /// Rows decoded by the session's row decoder.
    Decoded(Vec<Row>),
    /// The response body, undecoded.
    Raw(Bytes),
    /// No rows; inserts return this.
    None,
}

impl Rows {
    /// Get the decoded rows, if any.
    #[must_use]
    pub fn decoded(&self) -> Option<&[Row]> {
        match self {
            Self::Decoded(rows) => Some(rows),
            _ => None,
        }
    }

    /// Get the raw body, if the rows were not decoded.
    #[must_use]
    pub fn raw(&self) -> Option<&Bytes> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Rows returned by a query, or rows written by an insert.
    pub num_rows: u64,
    /// The returned rows.
    pub rows: Rows,
    /// The summary header, when the server sent one.
    pub summary: Option<Summary>,
}
