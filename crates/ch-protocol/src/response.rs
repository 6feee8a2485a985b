//! Response classification.
//!
//! A complete response is either a success carrying a row payload, or a
//! server-side failure carrying the exception text and code. Transport
//! failures never reach this module.

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::headers::{self, HeaderList};
use crate::request::{FORMAT_ROW_BINARY, FORMAT_WITH_NAMES_AND_TYPES};
use crate::summary::Summary;

/// A fully received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: HeaderList,
    /// Body chunks in arrival order.
    pub body: Vec<Bytes>,
}

impl Response {
    /// Find a header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        headers::find(&self.headers, name)
    }

    /// Concatenate the body chunks.
    #[must_use]
    pub fn body_bytes(&self) -> Bytes {
        match self.body.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => {
                let mut buf = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
                for chunk in chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }

    /// Server exception code, if the header is present and numeric.
    #[must_use]
    pub fn exception_code(&self) -> Option<i32> {
        self.header(headers::EXCEPTION_CODE)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Parse the summary header, if present.
    pub fn summary(&self) -> Result<Option<Summary>, ProtocolError> {
        self.header(headers::SUMMARY).map(Summary::parse).transpose()
    }

    /// Format the server declared for the body.
    #[must_use]
    pub fn format(&self) -> ResponseFormat {
        ResponseFormat::from_header(self.header(headers::FORMAT))
    }
}

/// Row format declared in the response's format header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Rows preceded by column names and types.
    SelfDescribing,
    /// Rows only; types come from the caller.
    Typed,
    /// Any other format, or no header.
    Other,
}

impl ResponseFormat {
    /// Interpret a format header value.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(FORMAT_WITH_NAMES_AND_TYPES) => Self::SelfDescribing,
            Some(FORMAT_ROW_BINARY) => Self::Typed,
            _ => Self::Other,
        }
    }
}

/// The body of a successful response, tagged with how to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Decode without type hints.
    SelfDescribing(Bytes),
    /// Decode with the caller's type hints.
    Typed(Bytes),
    /// Opaque bytes for the caller to interpret.
    Raw(Bytes),
}

impl Payload {
    /// Borrow the body bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        match self {
            Self::SelfDescribing(b) | Self::Typed(b) | Self::Raw(b) => b,
        }
    }
}

/// Result of classifying a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Status 200.
    Success {
        /// Body and decode strategy.
        payload: Payload,
        /// Parsed summary header.
        summary: Option<Summary>,
    },
    /// Any other status.
    Failure {
        /// Exception text from the body.
        message: String,
        /// Exception code header.
        code: Option<i32>,
    },
}

/// Classify a complete response.
///
/// `typed` says whether the caller holds type hints; a headerless row body is
/// only decodable with them and is returned raw otherwise.
pub fn classify(response: &Response, typed: bool) -> Result<Outcome, ProtocolError> {
    let body = response.body_bytes();

    if response.status != 200 {
        let message = String::from_utf8_lossy(&body).trim_end().to_owned();
        return Ok(Outcome::Failure {
            message,
            code: response.exception_code(),
        });
    }

    let payload = match response.format() {
        ResponseFormat::SelfDescribing => Payload::SelfDescribing(body),
        ResponseFormat::Typed if typed => Payload::Typed(body),
        ResponseFormat::Typed | ResponseFormat::Other => Payload::Raw(body),
    };

    Ok(Outcome::Success {
        payload,
        summary: response.summary()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &[&'static [u8]]) -> Response {
        Response {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            body: body.iter().map(|b| Bytes::from_static(*b)).collect(),
        }
    }

    #[test]
    fn test_failure_with_code() {
        let r = response(
            500,
            &[(headers::EXCEPTION_CODE, "241")],
            &[b"Memory limit ", b"exceeded"],
        );
        assert_eq!(
            classify(&r, false).unwrap(),
            Outcome::Failure {
                message: "Memory limit exceeded".into(),
                code: Some(241)
            }
        );
    }

    #[test]
    fn test_failure_without_code() {
        let r = response(404, &[], &[b"There is no handler /nope\n"]);
        assert_eq!(
            classify(&r, false).unwrap(),
            Outcome::Failure {
                message: "There is no handler /nope".into(),
                code: None
            }
        );
    }

    #[test]
    fn test_success_formats() {
        let typed = response(200, &[(headers::FORMAT, "RowBinary")], &[b"\x01"]);
        assert!(matches!(
            classify(&typed, true).unwrap(),
            Outcome::Success { payload: Payload::Typed(_), summary: None }
        ));
        assert!(matches!(
            classify(&typed, false).unwrap(),
            Outcome::Success { payload: Payload::Raw(_), .. }
        ));

        let described = response(
            200,
            &[(headers::FORMAT, "RowBinaryWithNamesAndTypes")],
            &[b"\x01"],
        );
        assert!(matches!(
            classify(&described, true).unwrap(),
            Outcome::Success { payload: Payload::SelfDescribing(_), .. }
        ));

        let csv = response(200, &[(headers::FORMAT, "CSV")], &[b"1,", b"2\n"]);
        match classify(&csv, false).unwrap() {
            Outcome::Success { payload: Payload::Raw(b), .. } => assert_eq!(&b[..], b"1,2\n"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_summary() {
        let r = response(200, &[(headers::SUMMARY, r#"{"written_rows":"1000"}"#)], &[]);
        match classify(&r, false).unwrap() {
            Outcome::Success { summary, .. } => assert_eq!(summary.unwrap().written_rows, 1000),
            other => panic!("unexpected {other:?}"),
        }

        let bad = response(200, &[(headers::SUMMARY, "{")], &[]);
        assert!(classify(&bad, false).is_err());
    }
}
