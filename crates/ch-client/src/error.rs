//! Client error types.

use ch_codec::CodecError;
use ch_protocol::{ProtocolError, RequestRef, TaggedFrame};
use thiserror::Error;

use crate::decode::DecodeError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the byte transport.
///
/// Any of these ends the session: the transport is closed before the error
/// reaches the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The TCP connection was not established in time.
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    /// The scheme has no transport.
    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),

    /// Writing the request failed.
    #[error("send failed: {0}")]
    Send(#[source] CodecError),

    /// Reading the response failed.
    ///
    /// `partial` holds the frames received for the request before the
    /// failure, in arrival order.
    #[error("receive failed after {} frames: {source}", partial.len())]
    Receive {
        /// Underlying codec error, including timeouts.
        #[source]
        source: CodecError,
        /// Frames received before the failure.
        partial: Vec<TaggedFrame>,
    },

    /// The transport delivered frames out of order.
    #[error("malformed response: {0}")]
    Protocol(#[from] ProtocolError),

    /// A previous call was abandoned while its request was outstanding.
    #[error("request {0} was abandoned before its response completed")]
    Abandoned(RequestRef),
}

impl TransportError {
    /// Check if the failure was a poll timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout(_)
                | Self::Receive {
                    source: CodecError::Timeout(_),
                    ..
                }
        )
    }

    /// Frames collected before a receive failure.
    #[must_use]
    pub fn partial_frames(&self) -> &[TaggedFrame] {
        match self {
            Self::Receive { partial, .. } => partial,
            _ => &[],
        }
    }
}

/// Errors returned by client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The transport failed and the session was closed.
    ///
    /// The session must be replaced; further calls on it return
    /// [`Error::ConnectionClosed`].
    #[error("disconnected: {0}")]
    Disconnected(#[source] TransportError),

    /// The server rejected the statement. The session stays usable.
    #[error("server error{}: {message}", code.map(|c| format!(" {c}")).unwrap_or_default())]
    Server {
        /// Exception text.
        message: String,
        /// Exception code, when the server sent one.
        code: Option<i32>,
    },

    /// The operation is not supported by this protocol.
    #[error("{0}")]
    Unsupported(&'static str),

    /// A successful response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(#[source] ProtocolError),

    /// The row decoder rejected the response body.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The session's transport was already released.
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the session was torn down by this error.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected(_) | Self::ConnectionClosed)
    }

    /// Check if this is a server error with the given code.
    #[must_use]
    pub fn is_server_error(&self, code: i32) -> bool {
        matches!(self, Self::Server { code: Some(c), .. } if *c == code)
    }

    /// Get the server exception code, if any.
    #[must_use]
    pub fn server_code(&self) -> Option<i32> {
        match self {
            Self::Server { code, .. } => *code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = Error::Server {
            message: "Memory limit exceeded".into(),
            code: Some(241),
        };
        assert_eq!(err.to_string(), "server error 241: Memory limit exceeded");
        assert!(err.is_server_error(241));
        assert!(!err.is_disconnect());

        let err = Error::Server {
            message: "boom".into(),
            code: None,
        };
        assert_eq!(err.to_string(), "server error: boom");
    }

    #[test]
    fn test_timeout_classification() {
        let err = TransportError::Receive {
            source: CodecError::Timeout(Duration::from_secs(1)),
            partial: Vec::new(),
        };
        assert!(err.is_timeout());
        assert!(Error::Disconnected(err).is_disconnect());
        assert!(!TransportError::Abandoned(RequestRef::new(1)).is_timeout());
    }

    #[test]
    fn test_unsupported_message() {
        let err = Error::Unsupported("cursors are not supported");
        assert_eq!(err.to_string(), "cursors are not supported");
    }
}
