//! Codec error types.

use std::time::Duration;

use ch_protocol::RequestRef;
use thiserror::Error;

/// Errors raised by the HTTP codec and connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// IO error on the underlying stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The response status line could not be parsed.
    #[error("invalid status line: {0:?}")]
    InvalidStatusLine(String),

    /// A response header line could not be parsed.
    #[error("invalid header line: {0:?}")]
    InvalidHeader(String),

    /// Chunked body framing was malformed.
    #[error("invalid chunked body: {0}")]
    InvalidChunk(&'static str),

    /// The response head did not fit the read limit.
    #[error("response head exceeds {max} bytes")]
    HeadTooLarge {
        /// Maximum head size.
        max: usize,
    },

    /// The peer closed the connection before the response completed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A request was issued while another is still outstanding.
    #[error("request {0} is still in flight")]
    RequestInFlight(RequestRef),

    /// A body chunk or poll was issued without a matching request.
    #[error("no active request")]
    NoActiveRequest,

    /// No frame arrived within the poll timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl CodecError {
    /// Check if this error came from the peer going away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
            || matches!(self, Self::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::UnexpectedEof
            ))
    }
}
