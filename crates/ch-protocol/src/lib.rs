//! # ch-protocol
//!
//! IO-free pieces of the ClickHouse HTTP interface.
//!
//! This crate knows what goes on the wire and how to read it back, but never
//! touches a socket:
//!
//! - [`RequestBuilder`] turns a statement and its options into a [`Request`]
//! - [`FrameAccumulator`] folds [`TaggedFrame`]s for one [`RequestRef`] into a
//!   [`Response`]
//! - [`classify`] turns a [`Response`] into an [`Outcome`]
//! - [`Settings`] and [`Summary`] model the query-string settings and the
//!   summary header
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use ch_protocol::{
//!     classify, Frame, FrameAccumulator, Outcome, Progress, RequestRef, TaggedFrame,
//! };
//!
//! let id = RequestRef::new(1);
//! let mut acc = FrameAccumulator::new(id);
//! let frames = [
//!     Frame::Status(500),
//!     Frame::Headers(vec![("x-clickhouse-exception-code".into(), "60".into())]),
//!     Frame::Data(Bytes::from_static(b"Table default.t does not exist")),
//!     Frame::Done,
//! ];
//! let mut progress = Progress::More;
//! for frame in frames {
//!     progress = acc.push(TaggedFrame::new(id, frame)).unwrap();
//! }
//! assert_eq!(progress, Progress::Complete);
//!
//! let response = acc.finish().unwrap();
//! match classify(&response, false).unwrap() {
//!     Outcome::Failure { code, .. } => assert_eq!(code, Some(60)),
//!     Outcome::Success { .. } => unreachable!(),
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod accumulator;
pub mod error;
pub mod frame;
pub mod headers;
pub mod request;
pub mod response;
pub mod settings;
pub mod summary;

pub use accumulator::{FrameAccumulator, Progress};
pub use error::ProtocolError;
pub use frame::{Frame, RequestRef, TaggedFrame};
pub use headers::HeaderList;
pub use request::{
    Body, FORMAT_ROW_BINARY, FORMAT_WITH_NAMES_AND_TYPES, Method, Request, RequestBuilder,
    RequestHead,
};
pub use response::{Outcome, Payload, Response, ResponseFormat, classify};
pub use settings::Settings;
pub use summary::Summary;
