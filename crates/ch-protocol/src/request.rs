//! Request construction.
//!
//! Every statement goes to `POST /?<query string>`. The query string carries
//! the merged server settings followed by the encoded parameters. Queries send
//! the statement as the whole body; inserts stream it as the first body chunk
//! followed by the caller's row data.

use bytes::{BufMut, Bytes, BytesMut};
use ch_types::Params;
use url::form_urlencoded::byte_serialize;

use crate::headers::{self, HeaderList};
use crate::settings::Settings;

/// Self-describing row format: column names and types precede the rows.
pub const FORMAT_WITH_NAMES_AND_TYPES: &str = "RowBinaryWithNamesAndTypes";

/// Headerless row format: the caller supplies the column types.
pub const FORMAT_ROW_BINARY: &str = "RowBinary";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    /// Method name as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Request line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method.
    pub method: Method,
    /// Path including the query string.
    pub path: String,
    /// Request headers in order.
    pub headers: HeaderList,
}

impl RequestHead {
    /// Find a header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        headers::find(&self.headers, name)
    }
}

/// How the request body is transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// No body.
    Empty,
    /// The whole body in one buffer.
    Full(Bytes),
    /// The body follows as a sequence of chunks and an end marker.
    Stream,
}

/// A request ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request line and headers.
    pub head: RequestHead,
    /// Body framing.
    pub body: Body,
}

/// Builds requests for one call.
///
/// Credentials and database are attached as headers only when set; no empty
/// headers are emitted.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder<'a> {
    settings: Option<&'a Settings>,
    params: Option<&'a Params>,
    user: Option<&'a str>,
    password: Option<&'a str>,
    database: Option<&'a str>,
    format: Option<&'a str>,
    typed: bool,
}

impl<'a> RequestBuilder<'a> {
    /// Create a builder with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Server settings for the query string.
    #[must_use]
    pub fn settings(mut self, settings: &'a Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Parameters for the query string.
    #[must_use]
    pub fn params(mut self, params: &'a Params) -> Self {
        self.params = Some(params);
        self
    }

    /// User name header.
    #[must_use]
    pub fn user(mut self, user: Option<&'a str>) -> Self {
        self.user = user;
        self
    }

    /// Password header.
    #[must_use]
    pub fn password(mut self, password: Option<&'a str>) -> Self {
        self.password = password;
        self
    }

    /// Database header.
    #[must_use]
    pub fn database(mut self, database: Option<&'a str>) -> Self {
        self.database = database;
        self
    }

    /// Explicit format, appended to the statement.
    #[must_use]
    pub fn format(mut self, format: Option<&'a str>) -> Self {
        self.format = format;
        self
    }

    /// Whether the caller supplies column types for the result.
    #[must_use]
    pub fn typed(mut self, typed: bool) -> Self {
        self.typed = typed;
        self
    }

    /// Format requested through the format header for a query.
    #[must_use]
    pub fn resolved_format(&self) -> &'a str {
        match self.format {
            Some(format) => format,
            None if self.typed => FORMAT_ROW_BINARY,
            None => FORMAT_WITH_NAMES_AND_TYPES,
        }
    }

    /// Build a query request carrying `statement` as its body.
    #[must_use]
    pub fn query(&self, statement: &str) -> Request {
        let mut headers = self.auth_headers();
        headers.push((headers::FORMAT.to_owned(), self.resolved_format().to_owned()));

        let body = match self.format {
            Some(format) => {
                let mut buf = BytesMut::with_capacity(statement.len() + format.len() + 8);
                buf.put_slice(statement.as_bytes());
                buf.put_slice(b" FORMAT ");
                buf.put_slice(format.as_bytes());
                buf.freeze()
            }
            None => Bytes::copy_from_slice(statement.as_bytes()),
        };

        Request {
            head: RequestHead {
                method: Method::Post,
                path: self.path(),
                headers,
            },
            body: Body::Full(body),
        }
    }

    /// Build an insert request and the first body chunk.
    ///
    /// The chunk is the statement, followed by ` FORMAT <format>` and a line
    /// break when a format is set. Row data follows as further chunks.
    #[must_use]
    pub fn insert(&self, statement: &str) -> (Request, Bytes) {
        let mut first = BytesMut::from(statement.as_bytes());
        if let Some(format) = self.format {
            first.put_slice(b" FORMAT ");
            first.put_slice(format.as_bytes());
            first.put_u8(b'\n');
        }

        let request = Request {
            head: RequestHead {
                method: Method::Post,
                path: self.path(),
                headers: self.auth_headers(),
            },
            body: Body::Stream,
        };
        (request, first.freeze())
    }

    /// Build the liveness probe request.
    #[must_use]
    pub fn ping() -> Request {
        Request {
            head: RequestHead {
                method: Method::Get,
                path: "/ping".to_owned(),
                headers: Vec::new(),
            },
            body: Body::Empty,
        }
    }

    fn auth_headers(&self) -> HeaderList {
        [
            (headers::USER, self.user),
            (headers::KEY, self.password),
            (headers::DATABASE, self.database),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_owned(), v.to_owned())))
        .collect()
    }

    fn path(&self) -> String {
        let mut path = String::from("/?");
        let mut first = true;
        let mut push = |key: &[u8], value: &[u8]| {
            if !first {
                path.push('&');
            }
            first = false;
            path.extend(byte_serialize(key));
            path.push('=');
            path.extend(byte_serialize(value));
        };

        if let Some(settings) = self.settings {
            for (k, v) in settings.iter() {
                push(k.as_bytes(), v.as_bytes());
            }
        }
        if let Some(params) = self.params {
            for param in params.encode() {
                let (name, value) = param.as_pair();
                push(name.as_bytes(), value);
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use ch_types::Value;

    use super::*;

    #[test]
    fn test_query_defaults() {
        let request = RequestBuilder::new().query("SELECT 1");
        assert_eq!(request.head.method, Method::Post);
        assert_eq!(request.head.path, "/?");
        assert_eq!(
            request.head.headers,
            vec![(headers::FORMAT.to_owned(), FORMAT_WITH_NAMES_AND_TYPES.to_owned())]
        );
        assert_eq!(request.body, Body::Full(Bytes::from_static(b"SELECT 1")));
    }

    #[test]
    fn test_typed_query_requests_row_binary() {
        let builder = RequestBuilder::new().typed(true);
        assert_eq!(builder.resolved_format(), FORMAT_ROW_BINARY);
        let request = builder.query("SELECT 1");
        assert_eq!(request.head.header(headers::FORMAT), Some(FORMAT_ROW_BINARY));
    }

    #[test]
    fn test_explicit_format_appended() {
        let request = RequestBuilder::new()
            .format(Some("CSVWithNames"))
            .query("SELECT 1");
        assert_eq!(request.head.header(headers::FORMAT), Some("CSVWithNames"));
        assert_eq!(
            request.body,
            Body::Full(Bytes::from_static(b"SELECT 1 FORMAT CSVWithNames"))
        );
    }

    #[test]
    fn test_optional_headers() {
        let request = RequestBuilder::new()
            .user(Some("default"))
            .password(None)
            .database(Some("analytics"))
            .query("SELECT 1");
        assert_eq!(request.head.header(headers::USER), Some("default"));
        assert_eq!(request.head.header(headers::KEY), None);
        assert_eq!(request.head.header(headers::DATABASE), Some("analytics"));
    }

    #[test]
    fn test_query_string_order_and_encoding() {
        let settings = Settings::new().with("max_threads", 2).with("a b", "x&y");
        let params = Params::named([("name", Value::from("é ok"))]);
        let request = RequestBuilder::new()
            .settings(&settings)
            .params(&params)
            .query("SELECT {name:String}");
        assert_eq!(
            request.head.path,
            "/?max_threads=2&a+b=x%26y&param_name=%C3%A9+ok"
        );
    }

    #[test]
    fn test_insert() {
        let settings = Settings::new().with("async_insert", 1);
        let builder = RequestBuilder::new()
            .settings(&settings)
            .user(Some("u"))
            .format(Some("RowBinary"));
        let (request, first) = builder.insert("INSERT INTO t");

        assert_eq!(request.body, Body::Stream);
        assert_eq!(request.head.path, "/?async_insert=1");
        assert_eq!(request.head.header(headers::FORMAT), None);
        assert_eq!(request.head.header(headers::USER), Some("u"));
        assert_eq!(&first[..], b"INSERT INTO t FORMAT RowBinary\n");

        let (_, plain) = RequestBuilder::new().insert("INSERT INTO t VALUES");
        assert_eq!(&plain[..], b"INSERT INTO t VALUES");
    }

    #[test]
    fn test_ping() {
        let request = RequestBuilder::ping();
        assert_eq!(request.head.method, Method::Get);
        assert_eq!(request.head.path, "/ping");
        assert_eq!(request.body, Body::Empty);
    }
}
