//! Scripted in-memory transport.
//!
//! [`MockTransport`] replays a script of poll results and records everything
//! the session sends. The recording lives behind a [`MockHandle`] so tests
//! can inspect it after the session has closed the transport.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ch_testing::mock_transport::{MockTransport, Step};
//!
//! let transport = MockTransport::new()
//!     .then(Step::response(200, &[], &[b"1\n"]));
//! let handle = transport.handle();
//! let mut session = Session::with_transport(transport, Config::default());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use ch_client::{Transport, TransportError};
use ch_codec::CodecError;
use ch_protocol::{Frame, Request, RequestRef, TaggedFrame};

/// One scripted answer to a poll.
pub enum Step {
    /// Frames for the active request.
    Frames(Vec<Frame>),
    /// Frames tagged with some other request.
    Foreign(RequestRef, Vec<Frame>),
    /// A poll that yields nothing.
    Idle,
    /// A poll that never completes.
    Hang,
    /// The poll times out.
    Timeout,
    /// The poll fails after decoding `partial`.
    Fail {
        /// Error reported by the poll.
        error: CodecError,
        /// Frames for the active request decoded before the error.
        partial: Vec<Frame>,
    },
}

impl Step {
    /// A whole response delivered in one poll.
    #[must_use]
    pub fn response(status: u16, headers: &[(&str, &str)], body: &[&[u8]]) -> Self {
        Self::Frames(response_frames(status, headers, body))
    }

    /// A `200` response with a single body chunk and no headers.
    #[must_use]
    pub fn ok(body: &[u8]) -> Self {
        Self::response(200, &[], &[body])
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frames(frames) => f.debug_tuple("Frames").field(&frames.len()).finish(),
            Self::Foreign(r, frames) => f
                .debug_tuple("Foreign")
                .field(r)
                .field(&frames.len())
                .finish(),
            Self::Idle => f.write_str("Idle"),
            Self::Hang => f.write_str("Hang"),
            Self::Timeout => f.write_str("Timeout"),
            Self::Fail { error, partial } => f
                .debug_struct("Fail")
                .field("error", error)
                .field("partial", &partial.len())
                .finish(),
        }
    }
}

/// Build the frame sequence of a complete response.
#[must_use]
pub fn response_frames(status: u16, headers: &[(&str, &str)], body: &[&[u8]]) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(body.len() + 3);
    frames.push(Frame::Status(status));
    frames.push(Frame::Headers(
        headers
            .iter()
            .map(|(n, v)| ((*n).to_owned(), (*v).to_owned()))
            .collect(),
    ));
    frames.extend(body.iter().map(|chunk| Frame::Data(Bytes::copy_from_slice(chunk))));
    frames.push(Frame::Done);
    frames
}

/// Something the session did to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A request was issued.
    Request(RequestRef),
    /// A body chunk was streamed.
    Chunk(RequestRef, Bytes),
    /// The body was finished.
    Finish(RequestRef),
    /// A poll was made with this timeout.
    Poll(Duration),
    /// The transport was closed.
    Close,
}

#[derive(Debug, Default)]
struct Log {
    requests: Vec<Request>,
    events: Vec<Event>,
}

/// Shared view of what a [`MockTransport`] recorded.
#[derive(Debug, Clone, Default)]
pub struct MockHandle(Arc<Mutex<Log>>);

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, Log> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests issued, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<Request> {
        self.lock().requests.last().cloned()
    }

    /// Every recorded event, in order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Body chunks streamed for `request`, in order.
    #[must_use]
    pub fn chunks(&self, request: RequestRef) -> Vec<Bytes> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Chunk(r, chunk) if *r == request => Some(chunk.clone()),
                _ => None,
            })
            .collect()
    }

    /// Timeouts passed to each poll.
    #[must_use]
    pub fn poll_timeouts(&self) -> Vec<Duration> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Poll(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Check if the transport was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().events.contains(&Event::Close)
    }

    fn record(&self, event: Event) {
        self.lock().events.push(event);
    }
}

/// A transport that replays scripted poll results.
///
/// Request tokens are handed out from 1 upwards. Like the HTTP transport it
/// refuses a second request while one is outstanding; a request stops being
/// outstanding once its `Done` frame has been delivered. An exhausted script
/// behaves as a timeout.
#[derive(Debug)]
pub struct MockTransport {
    script: VecDeque<Step>,
    next: RequestRef,
    active: Option<RequestRef>,
    send_error: Option<CodecError>,
    log: MockHandle,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            next: RequestRef::new(1),
            active: None,
            send_error: None,
            log: MockHandle::default(),
        }
    }

    /// Append a step to the script.
    #[must_use]
    pub fn then(mut self, step: Step) -> Self {
        self.script.push_back(step);
        self
    }

    /// Fail the next request with `error`.
    #[must_use]
    pub fn fail_send(mut self, error: CodecError) -> Self {
        self.send_error = Some(error);
        self
    }

    /// Get a handle on the recording.
    #[must_use]
    pub fn handle(&self) -> MockHandle {
        self.log.clone()
    }

    fn active(&self) -> Result<RequestRef, TransportError> {
        self.active
            .ok_or(TransportError::Send(CodecError::NoActiveRequest))
    }
}

impl Transport for MockTransport {
    async fn request(&mut self, request: Request) -> Result<RequestRef, TransportError> {
        if let Some(error) = self.send_error.take() {
            return Err(TransportError::Send(error));
        }
        if let Some(active) = self.active {
            return Err(TransportError::Send(CodecError::RequestInFlight(active)));
        }

        let id = self.next;
        self.next = id.next();
        self.active = Some(id);

        let mut log = self.log.lock();
        log.requests.push(request);
        log.events.push(Event::Request(id));
        Ok(id)
    }

    async fn stream_chunk(&mut self, request: RequestRef, chunk: Bytes) -> Result<(), TransportError> {
        self.active()?;
        self.log.record(Event::Chunk(request, chunk));
        Ok(())
    }

    async fn finish_body(&mut self, request: RequestRef) -> Result<(), TransportError> {
        self.active()?;
        self.log.record(Event::Finish(request));
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Vec<TaggedFrame>, TransportError> {
        self.log.record(Event::Poll(timeout));

        let timed_out = || TransportError::Receive {
            source: CodecError::Timeout(timeout),
            partial: Vec::new(),
        };

        match self.script.pop_front() {
            None | Some(Step::Timeout) => Err(timed_out()),
            Some(Step::Idle) => Ok(Vec::new()),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Foreign(other, frames)) => Ok(frames
                .into_iter()
                .map(|frame| TaggedFrame::new(other, frame))
                .collect()),
            Some(Step::Frames(frames)) => {
                let id = self.active().map_err(|_| TransportError::Receive {
                    source: CodecError::NoActiveRequest,
                    partial: Vec::new(),
                })?;
                if frames.iter().any(Frame::is_done) {
                    self.active = None;
                }
                Ok(frames
                    .into_iter()
                    .map(|frame| TaggedFrame::new(id, frame))
                    .collect())
            }
            Some(Step::Fail { error, partial }) => {
                let id = self.active.unwrap_or(RequestRef::new(0));
                Err(TransportError::Receive {
                    source: error,
                    partial: partial
                        .into_iter()
                        .map(|frame| TaggedFrame::new(id, frame))
                        .collect(),
                })
            }
        }
    }

    async fn close(&mut self) {
        self.active = None;
        self.log.record(Event::Close);
    }
}
