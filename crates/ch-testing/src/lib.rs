//! # ch-testing
//!
//! Test infrastructure for ClickHouse client development.
//!
//! ## Features
//!
//! - [`MockTransport`]: a scripted in-memory transport for driving a
//!   session through exact frame sequences, timeouts and failures
//! - [`MockHttpServer`]: a local HTTP server with canned responses that
//!   records every request it receives
//! - [`init_tracing`]: test-friendly log output

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_server;
pub mod mock_transport;

pub use mock_server::{CapturedRequest, MockHttpServer, MockResponse, MockServerBuilder, MockServerError};
pub use mock_transport::{Event, MockHandle, MockTransport, Step, response_frames};

/// Install a `tracing` subscriber writing to the test harness.
///
/// Filtering follows `RUST_LOG`. Calling this more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
