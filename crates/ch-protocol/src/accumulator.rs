//! Response reassembly from tagged frames.
//!
//! A transport may deliver a response across any number of polls, each
//! returning zero or more frames. [`FrameAccumulator`] folds them into one
//! ordered buffer for the active request and reports whether the terminal
//! frame has been seen.
//!
//! Frames tagged with another request are never mixed into the buffer. They
//! are reported as [`Progress::Foreign`] so the caller can log them and keep
//! polling; a foreign `Done` in particular does not complete the active
//! request.

use crate::error::ProtocolError;
use crate::frame::{Frame, RequestRef, TaggedFrame};
use crate::response::Response;

/// What the accumulator expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Status,
    Headers,
    Body,
    Finished,
}

impl Expect {
    fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Headers => "headers",
            Self::Body => "data or done",
            Self::Finished => "nothing",
        }
    }
}

/// Result of feeding one frame to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The frame was accepted; more frames are expected.
    More,
    /// The terminal frame for the active request was accepted.
    Complete,
    /// The frame belongs to another request and was not accepted.
    Foreign(RequestRef),
}

/// Collects the frames of one response in arrival order.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    request: RequestRef,
    expect: Expect,
    frames: Vec<Frame>,
}

impl FrameAccumulator {
    /// Create an accumulator for the response to `request`.
    #[must_use]
    pub fn new(request: RequestRef) -> Self {
        Self {
            request,
            expect: Expect::Status,
            frames: Vec::new(),
        }
    }

    /// Check if the terminal frame has been accepted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.expect == Expect::Finished
    }

    /// Frames accepted so far, in arrival order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Consume the accumulator, returning the accepted frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Feed one frame.
    ///
    /// Returns an error if the frame breaks the `Status, Headers, Data*,
    /// Done` order for the active request.
    pub fn push(&mut self, tagged: TaggedFrame) -> Result<Progress, ProtocolError> {
        if tagged.request != self.request {
            return Ok(Progress::Foreign(tagged.request));
        }

        let frame = tagged.frame;
        let next = match (self.expect, &frame) {
            (Expect::Status, Frame::Status(_)) => Expect::Headers,
            (Expect::Headers, Frame::Headers(_)) => Expect::Body,
            (Expect::Body, Frame::Data(_)) => Expect::Body,
            (Expect::Body, Frame::Done) => Expect::Finished,
            (Expect::Finished, f) => return Err(ProtocolError::FrameAfterDone(f.kind())),
            (expect, f) => {
                return Err(ProtocolError::UnexpectedFrame {
                    expected: expect.name(),
                    got: f.kind(),
                });
            }
        };

        self.expect = next;
        self.frames.push(frame);

        Ok(if self.is_complete() {
            Progress::Complete
        } else {
            Progress::More
        })
    }

    /// Feed the frames returned by one poll.
    ///
    /// Stops at the terminal frame; a frame for the active request after it
    /// is an error. Foreign frames are passed to `on_foreign` and skipped.
    pub fn extend<I, F>(&mut self, frames: I, mut on_foreign: F) -> Result<Progress, ProtocolError>
    where
        I: IntoIterator<Item = TaggedFrame>,
        F: FnMut(RequestRef, &Frame),
    {
        let mut progress = if self.is_complete() {
            Progress::Complete
        } else {
            Progress::More
        };

        for tagged in frames {
            if tagged.request != self.request {
                on_foreign(tagged.request, &tagged.frame);
                continue;
            }
            progress = self.push(tagged)?;
        }

        Ok(progress)
    }

    /// Turn the accepted frames into a response.
    pub fn finish(self) -> Result<Response, ProtocolError> {
        if !self.is_complete() {
            return Err(ProtocolError::Incomplete(self.expect.name()));
        }

        let mut status = 0;
        let mut headers = Vec::new();
        let mut body = Vec::new();
        for frame in self.frames {
            match frame {
                Frame::Status(code) => status = code,
                Frame::Headers(h) => headers = h,
                Frame::Data(chunk) => body.push(chunk),
                Frame::Done => {}
            }
        }

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;

    use super::*;

    const R1: RequestRef = RequestRef::new(1);
    const R2: RequestRef = RequestRef::new(2);

    fn tag(frame: Frame) -> TaggedFrame {
        TaggedFrame::new(R1, frame)
    }

    fn well_ordered() -> Vec<TaggedFrame> {
        vec![
            tag(Frame::Status(200)),
            tag(Frame::Headers(vec![("a".into(), "b".into())])),
            tag(Frame::Data(Bytes::from_static(b"one"))),
            tag(Frame::Data(Bytes::from_static(b"two"))),
            tag(Frame::Done),
        ]
    }

    #[test]
    fn test_complete_sequence_keeps_order() {
        let mut acc = FrameAccumulator::new(R1);
        let frames = well_ordered();
        let expected: Vec<Frame> = frames.iter().map(|t| t.frame.clone()).collect();

        let mut last = Progress::More;
        for f in frames {
            last = acc.push(f).unwrap();
        }
        assert_eq!(last, Progress::Complete);
        assert_eq!(acc.frames(), &expected[..]);

        let response = acc.finish().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body_bytes()[..], b"onetwo");
    }

    #[test]
    fn test_across_polls() {
        let mut acc = FrameAccumulator::new(R1);
        let mut frames = well_ordered().into_iter();

        let first: Vec<_> = frames.by_ref().take(2).collect();
        assert_eq!(acc.extend(first, |_, _| {}).unwrap(), Progress::More);
        // An empty poll is just "more".
        assert_eq!(acc.extend(Vec::new(), |_, _| {}).unwrap(), Progress::More);
        assert_eq!(acc.extend(frames, |_, _| {}).unwrap(), Progress::Complete);
    }

    #[test]
    fn test_foreign_done_does_not_complete() {
        let mut acc = FrameAccumulator::new(R1);
        acc.push(tag(Frame::Status(200))).unwrap();

        let progress = acc.push(TaggedFrame::new(R2, Frame::Done)).unwrap();
        assert_eq!(progress, Progress::Foreign(R2));
        assert!(!acc.is_complete());

        let mut seen = Vec::new();
        let progress = acc
            .extend(
                vec![
                    TaggedFrame::new(R2, Frame::Data(Bytes::from_static(b"x"))),
                    tag(Frame::Headers(Vec::new())),
                ],
                |r, f| seen.push((r, f.kind())),
            )
            .unwrap();
        assert_eq!(progress, Progress::More);
        assert_eq!(seen, vec![(R2, "data")]);
        assert_eq!(acc.frames().len(), 2);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut acc = FrameAccumulator::new(R1);
        let err = acc.push(tag(Frame::Data(Bytes::new()))).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedFrame {
                expected: "status",
                got: "data"
            }
        );

        let mut acc = FrameAccumulator::new(R1);
        acc.push(tag(Frame::Status(200))).unwrap();
        assert!(acc.push(tag(Frame::Done)).is_err());
    }

    #[test]
    fn test_frame_after_done_rejected() {
        let mut acc = FrameAccumulator::new(R1);
        let mut frames = well_ordered();
        frames.push(tag(Frame::Data(Bytes::from_static(b"late"))));
        let err = acc.extend(frames, |_, _| {}).unwrap_err();
        assert_eq!(err, ProtocolError::FrameAfterDone("data"));
    }

    #[test]
    fn test_finish_incomplete() {
        let mut acc = FrameAccumulator::new(R1);
        acc.push(tag(Frame::Status(200))).unwrap();
        assert_eq!(
            acc.finish().unwrap_err(),
            ProtocolError::Incomplete("headers")
        );
    }
}
