//! Commands a session executes.

use std::fmt;

use bytes::Bytes;
use ch_types::Params;

/// Row data for an insert.
///
/// The source is pulled one chunk at a time while the request body is
/// written, so rows are never collected up front.
pub struct RowSource(Box<dyn Iterator<Item = Bytes> + Send>);

impl RowSource {
    /// Wrap any iterator of byte-like chunks.
    pub fn new<I, B>(rows: I) -> Self
    where
        I: IntoIterator<Item = B>,
        I::IntoIter: Send + 'static,
        B: Into<Bytes> + 'static,
    {
        Self(Box::new(rows.into_iter().map(Into::into)))
    }

    /// Put `chunk` ahead of the remaining rows.
    #[must_use]
    pub fn prepend(self, chunk: Bytes) -> Self {
        Self(Box::new(std::iter::once(chunk).chain(self.0)))
    }
}

impl Iterator for RowSource {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.0.next()
    }
}

impl fmt::Debug for RowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RowSource(..)")
    }
}

/// A statement and what goes with it.
///
/// Queries send their statement as the request body and bind parameters
/// through the query string. Inserts stream the statement followed by
/// caller-encoded row data.
#[derive(Debug)]
pub enum Command {
    /// A statement whose response may carry rows.
    Query {
        /// Statement text.
        statement: String,
        /// Bound parameters.
        params: Params,
    },
    /// An insert streaming pre-encoded row data.
    Insert {
        /// Statement text.
        statement: String,
        /// Row data chunks, sent verbatim and in order.
        rows: RowSource,
    },
}

impl Command {
    /// Build a query.
    pub fn query(statement: impl Into<String>, params: impl Into<Params>) -> Self {
        Self::Query {
            statement: statement.into(),
            params: params.into(),
        }
    }

    /// Build an insert. `rows` is not consumed until the command runs.
    pub fn insert<I, B>(statement: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = B>,
        I::IntoIter: Send + 'static,
        B: Into<Bytes> + 'static,
    {
        Self::Insert {
            statement: statement.into(),
            rows: RowSource::new(rows),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_insert_is_lazy() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let command = Command::insert(
            "INSERT INTO t",
            (0..100).map(move |i| {
                counter.fetch_add(1, Ordering::SeqCst);
                format!("{i}\n")
            }),
        );
        assert_eq!(pulled.load(Ordering::SeqCst), 0);

        let Command::Insert { rows, .. } = command else {
            unreachable!("built as an insert");
        };
        let mut rows = rows.prepend(Bytes::from_static(b"INSERT INTO t\n"));
        assert_eq!(rows.next().unwrap().as_ref(), b"INSERT INTO t\n");
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        assert_eq!(rows.next().unwrap().as_ref(), b"0\n");
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }
}
