//! HTTP/1.1 codec for tokio-util framing.
//!
//! The decoder turns a response byte stream into [`Frame`]s. The encoder
//! writes request heads and bodies, either in one piece or chunked.

use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};
use ch_protocol::{Frame, HeaderList, RequestHead};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Maximum size of a response head (status line and headers).
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Maximum number of headers in a response head.
pub const MAX_HEADERS: usize = 64;

/// Maximum size of a chunk-size or trailer line.
const MAX_LINE_SIZE: usize = 4 * 1024;

const CRLF: &[u8] = b"\r\n";

/// Body framing announced in a request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body.
    Empty,
    /// A body of known length follows.
    Length(usize),
    /// A chunked body follows.
    Chunked,
}

/// An outbound piece of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Request line and headers.
    Head {
        /// Method, path and headers.
        head: RequestHead,
        /// How the body is framed.
        framing: BodyFraming,
    },
    /// A complete body announced with [`BodyFraming::Length`].
    Full(Bytes),
    /// One chunk of a [`BodyFraming::Chunked`] body.
    Chunk(Bytes),
    /// End of a chunked body.
    EndOfBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Length(u64),
    ChunkSize,
    ChunkData(u64),
    ChunkEnd,
    Trailers,
    UntilClose,
}

/// HTTP/1.1 codec.
#[derive(Debug)]
pub struct HttpCodec {
    host: String,
    state: State,
    pending: VecDeque<Frame>,
}

impl HttpCodec {
    /// Create a codec that sends `host` in the `host` header.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: State::Head,
            pending: VecDeque::new(),
        }
    }

    /// Check if the decoder sits between responses.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::Head && self.pending.is_empty()
    }

    /// Parse one response head from `src`.
    ///
    /// Returns `Ok(false)` if more bytes are needed. Interim `1xx` responses
    /// are consumed without producing frames.
    fn decode_head(&mut self, src: &mut BytesMut) -> Result<bool, CodecError> {
        let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut response = httparse::Response::new(&mut slots);
        let len = match response.parse(src) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) if src.len() > MAX_HEAD_SIZE => {
                return Err(CodecError::HeadTooLarge { max: MAX_HEAD_SIZE });
            }
            Ok(httparse::Status::Partial) => return Ok(false),
            Err(httparse::Error::Version | httparse::Error::Status | httparse::Error::Token) => {
                return Err(CodecError::InvalidStatusLine(first_line(src)));
            }
            Err(e) => return Err(CodecError::InvalidHeader(e.to_string())),
        };

        let status = response
            .code
            .ok_or_else(|| CodecError::InvalidStatusLine(first_line(src)))?;
        let headers: HeaderList = response
            .headers
            .iter()
            .map(|h| {
                (
                    h.name.to_ascii_lowercase(),
                    String::from_utf8_lossy(h.value).trim().to_owned(),
                )
            })
            .collect();
        let _ = src.split_to(len);

        if (100..200).contains(&status) {
            tracing::trace!(status, "skipped interim response");
            return Ok(true);
        }

        tracing::trace!(status, headers = headers.len(), "decoded response head");

        self.state = body_state(status, &headers)?;
        self.pending.push_back(Frame::Status(status));
        self.pending.push_back(Frame::Headers(headers));
        Ok(true)
    }

    fn done(&mut self) -> Frame {
        self.state = State::Head;
        Frame::Done
    }
}

impl Decoder for HttpCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }

            match self.state {
                State::Head => {
                    if src.is_empty() || !self.decode_head(src)? {
                        return Ok(None);
                    }
                }
                State::Length(0) => return Ok(Some(self.done())),
                State::Length(remaining) => {
                    let Some(data) = take_data(src, remaining) else {
                        return Ok(None);
                    };
                    self.state = State::Length(remaining - data.len() as u64);
                    return Ok(Some(Frame::Data(data)));
                }
                State::ChunkSize => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    let size = parse_chunk_size(&line)?;
                    self.state = if size == 0 {
                        State::Trailers
                    } else {
                        State::ChunkData(size)
                    };
                }
                State::ChunkData(remaining) => {
                    let Some(data) = take_data(src, remaining) else {
                        return Ok(None);
                    };
                    let left = remaining - data.len() as u64;
                    self.state = if left == 0 {
                        State::ChunkEnd
                    } else {
                        State::ChunkData(left)
                    };
                    return Ok(Some(Frame::Data(data)));
                }
                State::ChunkEnd => {
                    if src.len() < CRLF.len() {
                        return Ok(None);
                    }
                    if !src.starts_with(CRLF) {
                        return Err(CodecError::InvalidChunk("missing CRLF after chunk data"));
                    }
                    let _ = src.split_to(CRLF.len());
                    self.state = State::ChunkSize;
                }
                State::Trailers => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        return Ok(Some(self.done()));
                    }
                }
                State::UntilClose => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(Frame::Data(src.split().freeze())));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        match self.state {
            State::UntilClose => Ok(Some(self.done())),
            State::Head if src.is_empty() => Ok(None),
            _ => Err(CodecError::ConnectionClosed),
        }
    }
}

impl Encoder<Message> for HttpCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Head { head, framing } => {
                dst.put_slice(head.method.as_str().as_bytes());
                dst.put_u8(b' ');
                dst.put_slice(head.path.as_bytes());
                dst.put_slice(b" HTTP/1.1\r\n");
                put_header(dst, "host", &self.host);
                for (name, value) in &head.headers {
                    put_header(dst, name, value);
                }
                match framing {
                    BodyFraming::Empty => {}
                    BodyFraming::Length(len) => put_header(dst, "content-length", &len.to_string()),
                    BodyFraming::Chunked => put_header(dst, "transfer-encoding", "chunked"),
                }
                dst.put_slice(CRLF);

                tracing::trace!(
                    method = head.method.as_str(),
                    path = %head.path,
                    ?framing,
                    "encoded request head"
                );
            }
            Message::Full(body) => dst.put_slice(&body),
            // A zero-size chunk would end the body.
            Message::Chunk(chunk) if chunk.is_empty() => {}
            Message::Chunk(chunk) => {
                dst.reserve(chunk.len() + 20);
                dst.put_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                dst.put_slice(&chunk);
                dst.put_slice(CRLF);
            }
            Message::EndOfBody => dst.put_slice(b"0\r\n\r\n"),
        }
        Ok(())
    }
}

fn put_header(dst: &mut BytesMut, name: &str, value: &str) {
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(CRLF);
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// The status line, for error messages.
fn first_line(src: &[u8]) -> String {
    let end = find(src, CRLF).unwrap_or(src.len()).min(MAX_LINE_SIZE);
    String::from_utf8_lossy(&src[..end]).into_owned()
}

fn body_state(status: u16, headers: &[(String, String)]) -> Result<State, CodecError> {
    if status == 204 || status == 304 {
        return Ok(State::Length(0));
    }

    let chunked = ch_protocol::headers::find(headers, "transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return Ok(State::ChunkSize);
    }

    Ok(content_length(headers)?.map_or(State::UntilClose, State::Length))
}

/// The announced body length. Repeated headers must agree.
fn content_length(headers: &[(String, String)]) -> Result<Option<u64>, CodecError> {
    let mut length = None;
    for (_, value) in headers.iter().filter(|(name, _)| name == "content-length") {
        let parsed = Some(value.as_str())
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| CodecError::InvalidHeader(format!("content-length: {value}")))?;
        match length {
            Some(previous) if previous != parsed => {
                return Err(CodecError::InvalidHeader(format!(
                    "conflicting content-length: {previous} and {parsed}"
                )));
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length)
}

/// Split off up to `remaining` bytes, or `None` if `src` is empty.
fn take_data(src: &mut BytesMut, remaining: u64) -> Option<Bytes> {
    if src.is_empty() {
        return None;
    }
    let n = usize::try_from(remaining).unwrap_or(usize::MAX).min(src.len());
    Some(src.split_to(n).freeze())
}

/// Split off one CRLF-terminated line without its terminator.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, CodecError> {
    match find(src, CRLF) {
        Some(pos) => {
            let line = src.split_to(pos);
            let _ = src.split_to(CRLF.len());
            Ok(Some(line))
        }
        None if src.len() > MAX_LINE_SIZE => Err(CodecError::InvalidChunk("line too long")),
        None => Ok(None),
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, CodecError> {
    // Chunk extensions follow a `;` and are ignored.
    let size = line.split(|&b| b == b';').next().unwrap_or_default();
    std::str::from_utf8(size)
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| u64::from_str_radix(s, 16).ok())
        .ok_or(CodecError::InvalidChunk("bad chunk size"))
}
