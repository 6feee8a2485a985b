//! Protocol error types.

use thiserror::Error;

/// Errors raised while interpreting protocol data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A frame arrived out of order for the active request.
    #[error("unexpected {got} frame, expected {expected}")]
    UnexpectedFrame {
        /// Frame kind the accumulator was waiting for.
        expected: &'static str,
        /// Frame kind that arrived.
        got: &'static str,
    },

    /// A frame arrived for a request that already completed.
    #[error("{0} frame received after the response completed")]
    FrameAfterDone(&'static str),

    /// The response was used before its terminal frame arrived.
    #[error("response incomplete: missing {0}")]
    Incomplete(&'static str),

    /// The summary header is not valid JSON or has malformed counters.
    #[error("invalid summary header: {0}")]
    InvalidSummary(String),
}
