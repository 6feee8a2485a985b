//! Hooks called by an external connection pool.
//!
//! The HTTP interface has no transactions and no cursors: the transaction
//! hooks succeed without touching the transport, and cursor operations are
//! always rejected.

use ch_types::Params;

use crate::error::{Error, Result};
use crate::result::QueryResult;
use crate::session::Session;
use crate::transport::Transport;

/// Message returned by every cursor operation.
pub const CURSORS_UNSUPPORTED: &str = "cursors are not supported";

/// Transaction state reported to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Not inside a transaction.
    Idle,
    /// Inside a transaction.
    Transaction,
    /// Inside a failed transaction.
    Error,
}

/// Operations a connection pool invokes on a pooled connection.
///
/// # Native Async Traits
///
/// This uses native async traits (Rust 2024 Edition). Pools are expected to
/// be generic over the connection type.
#[allow(async_fn_in_trait)]
pub trait ConnectionLifecycle {
    /// Called when the pool hands the connection out.
    async fn checkout(&mut self) -> Result<()>;

    /// Check the connection is alive.
    async fn ping(&mut self) -> Result<()>;

    /// Begin a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commit a transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back a transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Current transaction state.
    fn status(&self) -> TransactionStatus;

    /// Declare a cursor.
    async fn declare(&mut self, statement: &str, params: &Params) -> Result<()>;

    /// Fetch from a cursor.
    async fn fetch(&mut self) -> Result<QueryResult>;

    /// Release a cursor.
    async fn deallocate(&mut self) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&mut self);
}

impl<T: Transport> ConnectionLifecycle for Session<T> {
    async fn checkout(&mut self) -> Result<()> {
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        Session::ping(self).await
    }

    async fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn status(&self) -> TransactionStatus {
        TransactionStatus::Idle
    }

    async fn declare(&mut self, _statement: &str, _params: &Params) -> Result<()> {
        Err(Error::Unsupported(CURSORS_UNSUPPORTED))
    }

    async fn fetch(&mut self) -> Result<QueryResult> {
        Err(Error::Unsupported(CURSORS_UNSUPPORTED))
    }

    async fn deallocate(&mut self) -> Result<()> {
        Err(Error::Unsupported(CURSORS_UNSUPPORTED))
    }

    async fn disconnect(&mut self) {
        self.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use ch_codec::CodecError;
    use ch_protocol::{Request, RequestRef, TaggedFrame};

    use super::*;
    use crate::config::Config;
    use crate::error::TransportError;

    /// A transport whose peer has gone away.
    #[derive(Default)]
    struct Gone {
        requests: usize,
    }

    impl Transport for Gone {
        async fn request(&mut self, _request: Request) -> std::result::Result<RequestRef, TransportError> {
            self.requests += 1;
            Err(TransportError::Send(CodecError::ConnectionClosed))
        }

        async fn stream_chunk(
            &mut self,
            _request: RequestRef,
            _chunk: Bytes,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn finish_body(&mut self, _request: RequestRef) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn poll(&mut self, _timeout: Duration) -> std::result::Result<Vec<TaggedFrame>, TransportError> {
            Ok(Vec::new())
        }

        async fn close(&mut self) {}
    }

    fn session() -> Session<Gone> {
        Session::with_transport(Gone::default(), Config::default())
    }

    #[tokio::test]
    async fn test_cursors_always_rejected() {
        let mut s = session();
        let params = Params::named([("x", 1i32)]);
        for err in [
            s.declare("SELECT 1", &params).await.unwrap_err(),
            s.declare("", &Params::None).await.unwrap_err(),
            s.fetch().await.unwrap_err(),
            s.deallocate().await.unwrap_err(),
        ] {
            assert!(matches!(err, Error::Unsupported(CURSORS_UNSUPPORTED)));
            assert_eq!(err.to_string(), "cursors are not supported");
        }
        assert_eq!(s.transport().unwrap().requests, 0);
    }

    #[tokio::test]
    async fn test_transaction_hooks_are_noops() {
        let mut s = session();
        s.checkout().await.unwrap();
        s.begin().await.unwrap();
        s.commit().await.unwrap();
        s.rollback().await.unwrap();
        assert_eq!(s.status(), TransactionStatus::Idle);
        assert_eq!(s.transport().unwrap().requests, 0);
        assert!(s.is_connected());
    }

    #[tokio::test]
    async fn test_ping_failure_disconnects() {
        let mut s = session();
        let err = ConnectionLifecycle::ping(&mut s).await.unwrap_err();
        assert!(matches!(err, Error::Disconnected(TransportError::Send(_))));
        assert!(!s.is_connected());

        let err = s.ping().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        s.disconnect().await;
        s.close().await;
        assert!(!s.is_connected());
    }
}
