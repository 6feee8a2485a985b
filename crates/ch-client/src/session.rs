//! Connection session.
//!
//! A [`Session`] owns one transport and the per-session defaults. It runs
//! one request at a time: build the request, send it (streaming the body for
//! inserts), poll until the response completes, then classify it.
//!
//! ## Failure policy
//!
//! Server-side failures (any status other than 200) come back as
//! [`Error::Server`] and leave the session usable. Transport failures of any
//! kind (connect, send, receive, timeout, malformed frame order) close the
//! transport before the error is returned as [`Error::Disconnected`]; the
//! session is never repaired and every later call fails with
//! [`Error::ConnectionClosed`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ch_protocol::{
    FrameAccumulator, Outcome, Payload, Progress, Request, RequestBuilder, RequestRef, Response,
    Settings, TaggedFrame, classify,
};
use ch_types::Params;

use crate::command::{Command, RowSource};
use crate::config::Config;
use crate::decode::RowDecoder;
use crate::error::{Error, Result, TransportError};
use crate::options::QueryOptions;
use crate::result::{QueryResult, Rows};
use crate::transport::{HttpTransport, Transport};

/// A connection to the server plus its defaults.
pub struct Session<T: Transport = HttpTransport> {
    transport: Option<T>,
    config: Config,
    decoder: Option<Arc<dyn RowDecoder>>,
    in_flight: Option<RequestRef>,
}

impl Session<HttpTransport> {
    /// Connect over HTTP.
    ///
    /// No request is made; credentials are attached to each request later.
    pub async fn open(config: Config) -> Result<Self> {
        let transport = HttpTransport::connect(&config)
            .await
            .map_err(Error::Disconnected)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already connected transport.
    pub fn with_transport(transport: T, config: Config) -> Self {
        Self {
            transport: Some(transport),
            config,
            decoder: None,
            in_flight: None,
        }
    }

    /// Decode row payloads with `decoder` instead of returning raw bytes.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn RowDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// The session's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if the transport is still held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Get a reference to the transport, if still held.
    #[must_use]
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Replace the default database.
    pub fn set_database(&mut self, database: Option<String>) {
        self.config.database = database;
    }

    /// Replace the default per-poll timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Replace the default credentials.
    pub fn set_credentials(&mut self, user: Option<String>, password: Option<String>) {
        self.config.user = user;
        self.config.password = password;
    }

    /// Replace the default settings.
    pub fn set_settings(&mut self, settings: Settings) {
        self.config.settings = settings;
    }

    /// Issue a liveness probe and drain its response.
    pub async fn ping(&mut self) -> Result<()> {
        let timeout = self.config.timeout;
        let response = self.round_trip(RequestBuilder::ping(), None, timeout).await?;
        tracing::debug!(status = response.status, "ping answered");
        Ok(())
    }

    /// Run a query with parameters.
    pub async fn query(
        &mut self,
        statement: &str,
        params: impl Into<Params>,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        self.execute(Command::query(statement, params), options).await
    }

    /// Run an insert, streaming `rows` after the statement.
    ///
    /// Rows are pulled from the iterator only once the request head has been
    /// sent, one chunk per write.
    pub async fn insert<I, B>(
        &mut self,
        statement: &str,
        rows: I,
        options: &QueryOptions,
    ) -> Result<QueryResult>
    where
        I: IntoIterator<Item = B>,
        I::IntoIter: Send + 'static,
        B: Into<Bytes> + 'static,
    {
        self.execute(Command::insert(statement, rows), options).await
    }

    /// Execute a command.
    pub async fn execute(&mut self, command: Command, options: &QueryOptions) -> Result<QueryResult> {
        let settings = self.config.settings.merge(&options.settings);
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let typed = options.types.is_some();

        let builder = RequestBuilder::new()
            .settings(&settings)
            .user(options.user.as_deref().or(self.config.user.as_deref()))
            .password(options.password.as_deref().or(self.config.password.as_deref()))
            .database(options.database.as_deref().or(self.config.database.as_deref()))
            .format(options.format.as_deref())
            .typed(typed);

        match command {
            Command::Query { statement, params } => {
                let request = builder.params(&params).query(&statement);
                let response = self.round_trip(request, None, timeout).await?;
                self.query_result(&response, options)
            }
            Command::Insert { statement, rows } => {
                let (request, first) = builder.insert(&statement);
                let body = rows.prepend(first);
                let response = self.round_trip(request, Some(body), timeout).await?;
                insert_result(&response)
            }
        }
    }

    /// Release the transport.
    ///
    /// Calling this again, or on a session that already disconnected, does
    /// nothing.
    pub async fn close(&mut self) {
        self.in_flight = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
    }

    /// Run one request to completion, disconnecting on any transport error.
    async fn round_trip(
        &mut self,
        request: Request,
        body: Option<RowSource>,
        timeout: Duration,
    ) -> Result<Response> {
        if let Some(abandoned) = self.in_flight {
            // A previous call was dropped mid-request; its response may still
            // be on the wire.
            return Err(self.fail_transport(TransportError::Abandoned(abandoned)).await);
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::ConnectionClosed);
        };

        let result = exchange(transport, &mut self.in_flight, request, body, timeout).await;
        match result {
            Ok(response) => Ok(response),
            Err(e) => Err(self.fail_transport(e).await),
        }
    }

    async fn fail_transport(&mut self, error: TransportError) -> Error {
        tracing::warn!(
            error = %error,
            partial_frames = error.partial_frames().len(),
            "transport failure, disconnecting"
        );
        self.close().await;
        Error::Disconnected(error)
    }

    fn query_result(&self, response: &Response, options: &QueryOptions) -> Result<QueryResult> {
        let (payload, summary) = match classify(response, options.types.is_some())
            .map_err(Error::InvalidResponse)?
        {
            Outcome::Success { payload, summary } => (payload, summary),
            Outcome::Failure { message, code } => return Err(Error::Server { message, code }),
        };

        let rows = match (payload, self.decoder.as_deref()) {
            (Payload::SelfDescribing(data), Some(decoder)) => {
                Rows::Decoded(decoder.decode_rows(&data, None)?)
            }
            (Payload::Typed(data), Some(decoder)) => {
                Rows::Decoded(decoder.decode_rows(&data, options.types.as_deref())?)
            }
            (payload, _) => Rows::Raw(payload.bytes().clone()),
        };

        let num_rows = match &rows {
            Rows::Decoded(rows) => rows.len() as u64,
            _ => summary.map_or(0, |s| s.result_rows),
        };

        Ok(QueryResult {
            num_rows,
            rows,
            summary,
        })
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.is_connected())
            .field("config", &self.config)
            .field("decoder", &self.decoder.is_some())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

/// Send `request`, stream `body` if given, and poll until the response
/// completes.
async fn exchange<T: Transport>(
    transport: &mut T,
    in_flight: &mut Option<RequestRef>,
    request: Request,
    body: Option<RowSource>,
    timeout: Duration,
) -> std::result::Result<Response, TransportError> {
    let method = request.head.method;
    let id = transport.request(request).await?;
    *in_flight = Some(id);
    tracing::debug!(request = %id, method = method.as_str(), "request issued");

    if let Some(rows) = body {
        let mut chunks = 0usize;
        for chunk in rows {
            transport.stream_chunk(id, chunk).await?;
            chunks += 1;
        }
        transport.finish_body(id).await?;
        tracing::debug!(request = %id, chunks, "request body streamed");
    }

    let mut acc = FrameAccumulator::new(id);
    loop {
        let frames = match transport.poll(timeout).await {
            Ok(frames) => frames,
            Err(TransportError::Receive { source, partial }) => {
                let mut collected: Vec<TaggedFrame> = acc
                    .into_frames()
                    .into_iter()
                    .map(|frame| TaggedFrame::new(id, frame))
                    .collect();
                collected.extend(partial);
                return Err(TransportError::Receive {
                    source,
                    partial: collected,
                });
            }
            Err(e) => return Err(e),
        };

        let progress = acc.extend(frames, |other, frame| {
            tracing::warn!(
                request = %id,
                foreign = %other,
                frame = frame.kind(),
                "ignoring frame for another request"
            );
        })?;
        if progress == Progress::Complete {
            break;
        }
    }

    *in_flight = None;
    Ok(acc.finish()?)
}

fn insert_result(response: &Response) -> Result<QueryResult> {
    match classify(response, false).map_err(Error::InvalidResponse)? {
        Outcome::Failure { message, code } => Err(Error::Server { message, code }),
        Outcome::Success { summary, .. } => Ok(QueryResult {
            num_rows: summary.map_or(0, |s| s.written_rows),
            rows: Rows::None,
            summary,
        }),
    }
}
