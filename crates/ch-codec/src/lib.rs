//! # ch-codec
//!
//! Async HTTP/1.1 framing for the ClickHouse client.
//!
//! This crate turns a raw byte stream into the tagged response frames the
//! protocol layer consumes, and writes requests with either a sized or a
//! chunked body.
//!
//! ## Architecture
//!
//! ```text
//! TcpStream -> HttpCodec (HTTP/1.1 framing) -> Connection (request tagging) -> Client
//! ```
//!
//! A [`Connection`] carries one request at a time. Responses are delivered
//! incrementally by [`Connection::recv`], which waits for the first frame up
//! to a timeout and then returns every frame that is already decodable.
//!
//! ```rust,ignore
//! use ch_codec::Connection;
//! use ch_protocol::RequestBuilder;
//!
//! let stream = TcpStream::connect("localhost:8123").await?;
//! let mut conn = Connection::new(stream, "localhost:8123");
//! let id = conn.send_request(RequestBuilder::ping()).await?;
//! let frames = conn.recv(Duration::from_secs(5)).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod http_codec;

pub use connection::{Connection, RecvError};
pub use error::CodecError;
pub use http_codec::{BodyFraming, HttpCodec, MAX_HEAD_SIZE, Message};
