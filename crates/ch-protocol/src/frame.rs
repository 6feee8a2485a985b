//! Response frames and request correlation.
//!
//! A transport reports a response as a sequence of frames tagged with the
//! [`RequestRef`] it handed out when the request was issued. For one request
//! the frames always arrive as:
//!
//! ```text
//! Status -> Headers -> Data* -> Done
//! ```

use std::fmt;

use bytes::Bytes;

use crate::headers::HeaderList;

/// Opaque correlation token identifying one request on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestRef(u64);

impl RequestRef {
    /// Create a token from a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The token following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One piece of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Status code from the status line.
    Status(u16),
    /// Response headers in arrival order.
    Headers(HeaderList),
    /// A chunk of the response body.
    Data(Bytes),
    /// End of the response.
    Done,
}

impl Frame {
    /// Short name of the frame kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Headers(_) => "headers",
            Self::Data(_) => "data",
            Self::Done => "done",
        }
    }

    /// Check if this is the terminal frame.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// A frame together with the request it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFrame {
    /// Request the frame belongs to.
    pub request: RequestRef,
    /// The frame itself.
    pub frame: Frame,
}

impl TaggedFrame {
    /// Tag `frame` with `request`.
    #[must_use]
    pub fn new(request: RequestRef, frame: Frame) -> Self {
        Self { request, frame }
    }
}
