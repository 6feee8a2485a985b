//! A request/response connection over any async byte stream.
//!
//! The connection carries at most one outstanding request. Each request gets
//! a fresh [`RequestRef`] and every frame decoded while it is outstanding is
//! tagged with it.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use ch_protocol::{Body, Request, RequestRef, TaggedFrame};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Framed;

use crate::error::CodecError;
use crate::http_codec::{BodyFraming, HttpCodec, Message};

/// A failed poll, with the frames decoded before the failure.
#[derive(Debug)]
pub struct RecvError {
    /// What went wrong.
    pub error: CodecError,
    /// Frames decoded by this poll before the error.
    pub partial: Vec<TaggedFrame>,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} partial frames)", self.error, self.partial.len())
    }
}

impl std::error::Error for RecvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<CodecError> for RecvError {
    fn from(error: CodecError) -> Self {
        Self {
            error,
            partial: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Active {
    request: RequestRef,
    streaming: bool,
}

/// An HTTP/1.1 connection.
pub struct Connection<T> {
    framed: Framed<T, HttpCodec>,
    last: RequestRef,
    active: Option<Active>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `io`, sending `host` as the `host` header.
    pub fn new(io: T, host: impl Into<String>) -> Self {
        Self {
            framed: Framed::new(io, HttpCodec::new(host)),
            last: RequestRef::new(0),
            active: None,
        }
    }

    /// The outstanding request, if any.
    #[must_use]
    pub fn active_request(&self) -> Option<RequestRef> {
        self.active.map(|a| a.request)
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &T {
        self.framed.get_ref()
    }

    /// Send a request head, and its body unless the body is streamed.
    ///
    /// Fails with [`CodecError::RequestInFlight`] while another request is
    /// outstanding.
    pub async fn send_request(&mut self, request: Request) -> Result<RequestRef, CodecError> {
        if let Some(active) = self.active {
            return Err(CodecError::RequestInFlight(active.request));
        }

        let id = self.last.next();
        self.last = id;

        let Request { head, body } = request;
        let (framing, full) = match body {
            Body::Empty => (BodyFraming::Empty, None),
            Body::Full(bytes) => (BodyFraming::Length(bytes.len()), Some(bytes)),
            Body::Stream => (BodyFraming::Chunked, None),
        };

        tracing::debug!(
            request = %id,
            method = head.method.as_str(),
            path = %head.path,
            "sending request"
        );

        self.active = Some(Active {
            request: id,
            streaming: framing == BodyFraming::Chunked,
        });
        self.framed.feed(Message::Head { head, framing }).await?;
        if let Some(bytes) = full {
            self.framed.feed(Message::Full(bytes)).await?;
        }
        self.framed.flush().await?;

        Ok(id)
    }

    /// Send one chunk of a streamed body.
    pub async fn send_chunk(&mut self, request: RequestRef, chunk: Bytes) -> Result<(), CodecError> {
        self.check_streaming(request)?;
        tracing::trace!(request = %request, len = chunk.len(), "sending body chunk");
        self.framed.send(Message::Chunk(chunk)).await
    }

    /// Finish a streamed body.
    pub async fn finish_body(&mut self, request: RequestRef) -> Result<(), CodecError> {
        self.check_streaming(request)?;
        self.framed.send(Message::EndOfBody).await?;
        if let Some(active) = self.active.as_mut() {
            active.streaming = false;
        }
        Ok(())
    }

    /// Wait up to `timeout` for response frames.
    ///
    /// Returns the first frame and every further frame that is already
    /// decodable, stopping at the end of the response. On failure the frames
    /// decoded by this poll are returned with the error.
    pub async fn recv(&mut self, timeout: Duration) -> Result<Vec<TaggedFrame>, RecvError> {
        let request = self
            .active
            .map(|a| a.request)
            .ok_or(CodecError::NoActiveRequest)?;

        let first = match tokio::time::timeout(timeout, self.framed.next()).await {
            Err(_) => return Err(CodecError::Timeout(timeout).into()),
            Ok(None) => return Err(CodecError::ConnectionClosed.into()),
            Ok(Some(result)) => result?,
        };

        let mut frames = Vec::new();
        let mut next = Some(first);
        while let Some(frame) = next.take() {
            let done = frame.is_done();
            tracing::trace!(request = %request, frame = frame.kind(), "received frame");
            frames.push(TaggedFrame::new(request, frame));
            if done {
                self.active = None;
                break;
            }

            next = match self.framed.next().now_or_never() {
                Some(Some(Ok(frame))) => Some(frame),
                Some(Some(Err(error))) => {
                    return Err(RecvError {
                        error,
                        partial: frames,
                    });
                }
                Some(None) | None => None,
            };
        }

        Ok(frames)
    }

    /// Shut down the write side of the stream.
    pub async fn close(&mut self) -> Result<(), CodecError> {
        self.active = None;
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }

    fn check_streaming(&self, request: RequestRef) -> Result<(), CodecError> {
        match self.active {
            Some(active) if active.request == request && active.streaming => Ok(()),
            _ => Err(CodecError::NoActiveRequest),
        }
    }
}

impl<T> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("last", &self.last)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ch_protocol::{Frame, RequestBuilder};
    use tokio_test::io::Builder;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn frames_of(tagged: &[TaggedFrame]) -> Vec<&Frame> {
        tagged.iter().map(|t| &t.frame).collect()
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let io = Builder::new()
            .write(
                b"POST /? HTTP/1.1\r\nhost: ch:8123\r\n\
                  x-clickhouse-format: RowBinaryWithNamesAndTypes\r\n\
                  content-length: 8\r\n\r\nSELECT 1",
            )
            .read(b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\n\r\nabc")
            .build();
        let mut conn = Connection::new(io, "ch:8123");

        let id = conn
            .send_request(RequestBuilder::new().query("SELECT 1"))
            .await
            .unwrap();
        assert_eq!(conn.active_request(), Some(id));

        let mut frames = Vec::new();
        while conn.active_request().is_some() {
            frames.extend(conn.recv(TIMEOUT).await.unwrap());
        }
        assert!(frames.iter().all(|t| t.request == id));
        assert_eq!(
            frames_of(&frames),
            vec![
                &Frame::Status(200),
                &Frame::Headers(vec![("content-length".into(), "3".into())]),
                &Frame::Data(Bytes::from_static(b"abc")),
                &Frame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_streamed_insert() {
        let io = Builder::new()
            .write(b"POST /? HTTP/1.1\r\nhost: ch\r\ntransfer-encoding: chunked\r\n\r\n")
            .write(b"d\r\nINSERT INTO t\r\n")
            .write(b"3\r\nrow\r\n")
            .write(b"0\r\n\r\n")
            .read(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .build();
        let mut conn = Connection::new(io, "ch");

        let (request, first) = RequestBuilder::new().insert("INSERT INTO t");
        let id = conn.send_request(request).await.unwrap();
        conn.send_chunk(id, first).await.unwrap();
        conn.send_chunk(id, Bytes::from_static(b"row")).await.unwrap();
        conn.finish_body(id).await.unwrap();

        assert!(matches!(
            conn.send_chunk(id, Bytes::from_static(b"late")).await,
            Err(CodecError::NoActiveRequest)
        ));

        let frames = conn.recv(TIMEOUT).await.unwrap();
        assert_eq!(frames.last().map(|t| &t.frame), Some(&Frame::Done));
        assert_eq!(conn.active_request(), None);
    }

    #[tokio::test]
    async fn test_single_outstanding_request() {
        let io = Builder::new()
            .write(b"GET /ping HTTP/1.1\r\nhost: ch\r\n\r\n")
            .build();
        let mut conn = Connection::new(io, "ch");

        let id = conn.send_request(RequestBuilder::ping()).await.unwrap();
        let err = conn.send_request(RequestBuilder::ping()).await.unwrap_err();
        assert!(matches!(err, CodecError::RequestInFlight(r) if r == id));
    }

    #[tokio::test]
    async fn test_partial_frames_on_error() {
        let io = Builder::new()
            .write(b"GET /ping HTTP/1.1\r\nhost: ch\r\n\r\n")
            .read(b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\nabc")
            .build();
        let mut conn = Connection::new(io, "ch");
        conn.send_request(RequestBuilder::ping()).await.unwrap();

        let err = conn.recv(TIMEOUT).await.unwrap_err();
        assert!(err.error.is_closed());
        assert_eq!(err.partial.len(), 3);
        assert_eq!(err.partial[2].frame, Frame::Data(Bytes::from_static(b"abc")));
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut conn = Connection::new(client, "ch");
        conn.send_request(RequestBuilder::ping()).await.unwrap();

        let err = conn.recv(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err.error, CodecError::Timeout(_)));
        assert!(err.partial.is_empty());
    }

    #[tokio::test]
    async fn test_recv_without_request() {
        let (client, _server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client, "ch");
        let err = conn.recv(TIMEOUT).await.unwrap_err();
        assert!(matches!(err.error, CodecError::NoActiveRequest));
    }
}
