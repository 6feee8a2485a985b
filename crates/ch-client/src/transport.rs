//! The byte transport a session drives.
//!
//! A transport issues one request at a time, streams body chunks for it and
//! reports the response as [`TaggedFrame`]s, possibly across many polls.
//! [`HttpTransport`] is the HTTP/1.1 implementation over TCP.

use std::time::Duration;

use bytes::Bytes;
use ch_codec::Connection;
use ch_protocol::{Request, RequestRef, TaggedFrame};
use tokio::net::TcpStream;

use crate::config::{Config, Scheme};
use crate::error::TransportError;

/// A request/response byte transport.
///
/// # Native Async Traits
///
/// This uses native async functions in traits (Rust 2024 Edition); the
/// session is generic over its transport, so no boxing is needed.
#[allow(async_fn_in_trait)]
pub trait Transport: Send {
    /// Issue a request and return its correlation token.
    ///
    /// For [`Body::Stream`](ch_protocol::Body::Stream) requests only the
    /// head is sent; the body follows through [`stream_chunk`] and
    /// [`finish_body`].
    ///
    /// [`stream_chunk`]: Transport::stream_chunk
    /// [`finish_body`]: Transport::finish_body
    async fn request(&mut self, request: Request) -> Result<RequestRef, TransportError>;

    /// Send one body chunk for a streamed request.
    async fn stream_chunk(&mut self, request: RequestRef, chunk: Bytes) -> Result<(), TransportError>;

    /// Send the end-of-body marker for a streamed request.
    async fn finish_body(&mut self, request: RequestRef) -> Result<(), TransportError>;

    /// Wait up to `timeout` for response frames.
    ///
    /// An empty result is not an error. Receive failures are reported as
    /// [`TransportError::Receive`] carrying the frames this poll decoded.
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<TaggedFrame>, TransportError>;

    /// Release the transport.
    async fn close(&mut self);
}

/// HTTP/1.1 over a TCP stream.
#[derive(Debug)]
pub struct HttpTransport {
    conn: Connection<TcpStream>,
    peer: String,
}

impl HttpTransport {
    /// Connect to the endpoint described by `config`.
    ///
    /// Only [`Scheme::Http`] is supported.
    pub async fn connect(config: &Config) -> Result<Self, TransportError> {
        if config.scheme != Scheme::Http {
            return Err(TransportError::UnsupportedScheme(
                config.scheme.as_str().to_owned(),
            ));
        }

        let addr = config.authority();
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout(addr.clone()))?
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        stream
            .set_nodelay(true)
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        tracing::info!(peer = %addr, "connected");

        Ok(Self {
            conn: Connection::new(stream, addr.clone()),
            peer: addr,
        })
    }

    /// `host:port` of the server.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for HttpTransport {
    async fn request(&mut self, request: Request) -> Result<RequestRef, TransportError> {
        self.conn
            .send_request(request)
            .await
            .map_err(TransportError::Send)
    }

    async fn stream_chunk(&mut self, request: RequestRef, chunk: Bytes) -> Result<(), TransportError> {
        self.conn
            .send_chunk(request, chunk)
            .await
            .map_err(TransportError::Send)
    }

    async fn finish_body(&mut self, request: RequestRef) -> Result<(), TransportError> {
        self.conn
            .finish_body(request)
            .await
            .map_err(TransportError::Send)
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Vec<TaggedFrame>, TransportError> {
        self.conn
            .recv(timeout)
            .await
            .map_err(|e| TransportError::Receive {
                source: e.error,
                partial: e.partial,
            })
    }

    async fn close(&mut self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(peer = %self.peer, error = %e, "error shutting down connection");
        }
        tracing::info!(peer = %self.peer, "connection closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_https_rejected() {
        let config = Config::new().scheme(Scheme::Https);
        let err = HttpTransport::connect(&config).await.unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(s) if s == "https"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::new().host("127.0.0.1").port(port);
        let err = HttpTransport::connect(&config).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
