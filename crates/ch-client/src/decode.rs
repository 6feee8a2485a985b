//! Row decoding seam.
//!
//! The row binary formats are decoded outside this crate. A session holds an
//! optional [`RowDecoder`]; without one, row payloads are returned as raw
//! bytes.

use ch_types::Value;
use thiserror::Error;

/// A decoded row.
pub type Row = Vec<Value>;

/// Error returned by a [`RowDecoder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row decode failed: {message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Create a decode error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Decodes row binary response bodies.
///
/// `types` is `None` for the self-describing format, where the column names
/// and types precede the rows, and holds the caller's column types for the
/// headerless format.
pub trait RowDecoder: Send + Sync {
    /// Decode `data` into rows, in order.
    fn decode_rows(&self, data: &[u8], types: Option<&[String]>) -> Result<Vec<Row>, DecodeError>;
}

impl<F> RowDecoder for F
where
    F: Fn(&[u8], Option<&[String]>) -> Result<Vec<Row>, DecodeError> + Send + Sync,
{
    fn decode_rows(&self, data: &[u8], types: Option<&[String]>) -> Result<Vec<Row>, DecodeError> {
        self(data, types)
    }
}
