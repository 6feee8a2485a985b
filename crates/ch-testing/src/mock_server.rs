//! Mock ClickHouse HTTP server for integration tests.
//!
//! The server accepts keep-alive connections on a local port, parses each
//! request (including chunked bodies), records it and answers with the next
//! canned [`MockResponse`]. When the queue is empty the default response is
//! used.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ch_testing::mock_server::{MockHttpServer, MockResponse};
//!
//! #[tokio::test]
//! async fn test_query() {
//!     let server = MockHttpServer::builder()
//!         .with_response(MockResponse::ok("1\n"))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let config = Config::new().host(server.host()).port(server.port());
//!     // Open a session against config...
//! }
//! ```

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast};

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent something that is not HTTP/1.1.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for mock server operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

/// A canned answer.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A well-formed HTTP response.
    Http {
        /// Status code.
        status: u16,
        /// Extra headers.
        headers: Vec<(String, String)>,
        /// Body chunks. Sent chunked when `chunked` is set, else concatenated
        /// with a content length.
        body: Vec<Bytes>,
        /// Use chunked transfer encoding.
        chunked: bool,
    },
    /// Bytes written verbatim.
    Raw(Bytes),
    /// Close the connection without answering.
    Hangup,
}

impl MockResponse {
    /// A `200` response with a fixed-length body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::Http {
            status: 200,
            headers: Vec::new(),
            body: vec![body.into()],
            chunked: false,
        }
    }

    /// A `200` response streaming `chunks` with chunked encoding.
    pub fn chunked<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::Http {
            status: 200,
            headers: Vec::new(),
            body: chunks.into_iter().map(Into::into).collect(),
            chunked: true,
        }
    }

    /// A server exception with the given code and message.
    pub fn exception(status: u16, code: i32, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            headers: vec![(
                "X-ClickHouse-Exception-Code".to_owned(),
                code.to_string(),
            )],
            body: vec![Bytes::from(message.into())],
            chunked: false,
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Http { headers, .. } = &mut self {
            headers.push((name.into(), value.into()));
        }
        self
    }

    /// Serialize the response as sent on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let (status, headers, body, chunked) = match self {
            Self::Http {
                status,
                headers,
                body,
                chunked,
            } => (*status, headers, body, *chunked),
            Self::Raw(raw) => return raw.clone(),
            Self::Hangup => return Bytes::new(),
        };

        let mut buf = BytesMut::with_capacity(256);
        buf.put_slice(format!("HTTP/1.1 {status} {}\r\n", reason(status)).as_bytes());
        for (name, value) in headers {
            buf.put_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        if chunked {
            buf.put_slice(b"Transfer-Encoding: chunked\r\n\r\n");
            for chunk in body.iter().filter(|c| !c.is_empty()) {
                buf.put_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                buf.put_slice(chunk);
                buf.put_slice(b"\r\n");
            }
            buf.put_slice(b"0\r\n\r\n");
        } else {
            let len: usize = body.iter().map(Bytes::len).sum();
            buf.put_slice(format!("Content-Length: {len}\r\n\r\n").as_bytes());
            for chunk in body {
                buf.put_slice(chunk);
            }
        }
        buf.freeze()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A request as received by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// Request method.
    pub method: String,
    /// Request target, including the query string.
    pub path: String,
    /// Headers in arrival order, names as sent.
    pub headers: Vec<(String, String)>,
    /// Body with any chunked framing removed.
    pub body: Bytes,
    /// Body sizes of each chunk, when the body was chunked.
    pub chunks: Option<Vec<usize>>,
}

impl CapturedRequest {
    /// Find a header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for [`MockHttpServer`].
#[derive(Debug)]
pub struct MockServerBuilder {
    responses: VecDeque<MockResponse>,
    default_response: MockResponse,
}

impl Default for MockServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServerBuilder {
    /// Create a builder answering `200 Ok.` by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            default_response: MockResponse::ok("Ok.\n"),
        }
    }

    /// Queue a response.
    #[must_use]
    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.responses.push_back(response);
        self
    }

    /// Set the response used once the queue is empty.
    #[must_use]
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Bind and start the server.
    pub async fn build(self) -> Result<MockHttpServer> {
        MockHttpServer::start(self).await
    }
}

struct Shared {
    responses: Mutex<VecDeque<MockResponse>>,
    default_response: MockResponse,
    captured: Mutex<Vec<CapturedRequest>>,
}

/// A local HTTP server answering with canned responses.
pub struct MockHttpServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    shared: Arc<Shared>,
}

impl MockHttpServer {
    /// Create a new builder for the mock server.
    #[must_use]
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    async fn start(builder: MockServerBuilder) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let shared = Arc::new(Shared {
            responses: Mutex::new(builder.responses),
            default_response: builder.default_response,
            captured: Mutex::new(Vec::new()),
        });

        let mut shutdown_rx = shutdown_tx.subscribe();
        let accept_shared = shared.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer)) => {
                                let shared = accept_shared.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, shared).await {
                                        tracing::debug!(peer = %peer, error = %e, "mock connection ended");
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "mock accept failed");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(Self {
            addr,
            shutdown_tx,
            shared,
        })
    }

    /// Get the server's listening address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the host string for connection configuration.
    #[must_use]
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.shared.captured.lock().await.clone()
    }

    /// Stop accepting connections.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) -> Result<()> {
    let mut stream = BufReader::new(stream);
    while let Some(request) = read_request(&mut stream).await? {
        tracing::trace!(method = %request.method, path = %request.path, "mock request");
        shared.captured.lock().await.push(request);

        let response = shared
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| shared.default_response.clone());
        if matches!(response, MockResponse::Hangup) {
            return Ok(());
        }
        stream.get_mut().write_all(&response.to_bytes()).await?;
        stream.get_mut().flush().await?;
    }
    Ok(())
}

/// Maximum number of headers accepted in a request head.
const MAX_HEADERS: usize = 64;

/// Read one request; `None` when the client closed between requests.
async fn read_request(stream: &mut BufReader<TcpStream>) -> Result<Option<CapturedRequest>> {
    let mut head = Vec::new();
    loop {
        let start = head.len();
        if stream.read_until(b'\n', &mut head).await? == 0 {
            if head.is_empty() {
                return Ok(None);
            }
            return Err(MockServerError::Protocol("eof in request head".into()));
        }
        if start > 0 && matches!(&head[start..], b"\r\n" | b"\n") {
            break;
        }
    }

    let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut slots);
    match parsed.parse(&head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Err(MockServerError::Protocol("incomplete request head".into()));
        }
        Err(e) => return Err(MockServerError::Protocol(format!("bad request head: {e}"))),
    }
    let method = parsed.method.unwrap_or_default().to_owned();
    let path = parsed.path.unwrap_or_default().to_owned();
    let headers: Vec<(String, String)> = parsed
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_owned(),
                String::from_utf8_lossy(h.value).trim().to_owned(),
            )
        })
        .collect();

    let find = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let (body, chunks) = if find("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        let (body, sizes) = read_chunked(stream).await?;
        (body, Some(sizes))
    } else {
        let len = match find("content-length") {
            Some(v) if v.bytes().all(|b| b.is_ascii_digit()) => v
                .parse::<usize>()
                .map_err(|_| MockServerError::Protocol(format!("bad content-length {v:?}")))?,
            Some(v) => return Err(MockServerError::Protocol(format!("bad content-length {v:?}"))),
            None => 0,
        };
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;
        (Bytes::from(body), None)
    };

    Ok(Some(CapturedRequest {
        method,
        path,
        headers,
        body,
        chunks,
    }))
}

async fn read_chunked(stream: &mut BufReader<TcpStream>) -> Result<(Bytes, Vec<usize>)> {
    let mut body = BytesMut::new();
    let mut sizes = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        stream.read_line(&mut line).await?;
        let size_str = line.trim_end().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| MockServerError::Protocol(format!("bad chunk size {line:?}")))?;
        if size == 0 {
            // Trailers end with an empty line.
            loop {
                line.clear();
                if stream.read_line(&mut line).await? == 0 || line.trim_end().is_empty() {
                    break;
                }
            }
            return Ok((body.freeze(), sizes));
        }

        let mut chunk = vec![0u8; size + 2];
        stream.read_exact(&mut chunk).await?;
        if !chunk.ends_with(b"\r\n") {
            return Err(MockServerError::Protocol("chunk not followed by CRLF".into()));
        }
        body.put_slice(&chunk[..size]);
        sizes.push(size);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_length_serialization() {
        let bytes = MockResponse::ok("1\n").with_header("X-Test", "y").to_bytes();
        assert_eq!(
            &bytes[..],
            b"HTTP/1.1 200 OK\r\nX-Test: y\r\nContent-Length: 2\r\n\r\n1\n"
        );
    }

    #[test]
    fn test_chunked_serialization_skips_empty_chunks() {
        let bytes = MockResponse::chunked(["ab", "", "c"]).to_bytes();
        assert_eq!(
            &bytes[..],
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nab\r\n1\r\nc\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_server_rejects_malformed_head() {
        let server = MockHttpServer::builder().build().await.unwrap();
        let mut client = TcpStream::connect(server.addr()).await.unwrap();
        client
            .write_all(b"POST / HTTP/1.1\r\nbad name: x\r\n\r\n")
            .await
            .unwrap();

        // The connection is dropped without an answer.
        let mut buf = vec![0u8; 64];
        assert_eq!(client.read(&mut buf).await.unwrap_or(0), 0);
        assert!(server.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_server_captures_chunked_request() {
        let server = MockHttpServer::builder().build().await.unwrap();
        let mut client = TcpStream::connect(server.addr()).await.unwrap();
        client
            .write_all(
                b"POST /?a=1 HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
            )
            .await
            .unwrap();

        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200 OK"));

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/?a=1");
        assert_eq!(requests[0].header("host"), Some("x"));
        assert_eq!(&requests[0].body[..], b"abcde");
        assert_eq!(requests[0].chunks, Some(vec![3, 2]));
    }
}
