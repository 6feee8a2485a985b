//! # ch-client
//!
//! Async ClickHouse client over the HTTP interface.
//!
//! This is the primary public API surface of the workspace. A [`Session`]
//! owns one connection and runs one request at a time over it.
//!
//! ## Features
//!
//! - **Typed parameters**: `{name:Type}` placeholders bound from
//!   [`Params`], encoded by `ch-types`
//! - **Streaming inserts**: row data is sent as a chunked body after the
//!   statement, in order, without buffering the whole request
//! - **Incremental responses**: frames are collected across polls until the
//!   response completes, with a per-poll timeout
//! - **Strict failure policy**: server errors keep the session, transport
//!   errors close it
//!
//! ## Example
//!
//! ```rust,ignore
//! use ch_client::{Config, Params, QueryOptions, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_url("http://default:@localhost:8123/default")?;
//!     let mut session = Session::open(config).await?;
//!
//!     let result = session
//!         .query(
//!             "SELECT number FROM system.numbers WHERE number < {limit:UInt64}",
//!             Params::named([("limit", 10u64)]),
//!             &QueryOptions::new().format("CSV"),
//!         )
//!         .await?;
//!     println!("{:?}", result.rows.raw());
//!
//!     let inserted = session
//!         .insert(
//!             "INSERT INTO events",
//!             [&b"1,click\n"[..], &b"2,view\n"[..]],
//!             &QueryOptions::new().format("CSV"),
//!         )
//!         .await?;
//!     println!("wrote {} rows", inserted.num_rows);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod decode;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod result;
pub mod session;
pub mod transport;

pub use command::{Command, RowSource};
pub use config::{Config, Scheme};
pub use decode::{DecodeError, Row, RowDecoder};
pub use error::{Error, Result, TransportError};
pub use lifecycle::{CURSORS_UNSUPPORTED, ConnectionLifecycle, TransactionStatus};
pub use options::QueryOptions;
pub use result::{QueryResult, Rows};
pub use session::Session;
pub use transport::{HttpTransport, Transport};

// Re-export the types callers need to build calls and read results.
pub use ch_protocol::{Settings, Summary};
pub use ch_types::{Params, ToParam, Value};
