//! Header names used by the ClickHouse HTTP interface.
//!
//! Names are lower-case; lookups with [`find`] ignore ASCII case.

/// Request: user name.
pub const USER: &str = "x-clickhouse-user";

/// Request: password.
pub const KEY: &str = "x-clickhouse-key";

/// Request: default database for the query.
pub const DATABASE: &str = "x-clickhouse-database";

/// Request: default output format. Response: format actually used.
pub const FORMAT: &str = "x-clickhouse-format";

/// Response: JSON object with progress counters.
pub const SUMMARY: &str = "x-clickhouse-summary";

/// Response: numeric server exception code.
pub const EXCEPTION_CODE: &str = "x-clickhouse-exception-code";

/// An ordered list of header name/value pairs.
pub type HeaderList = Vec<(String, String)>;

/// Find the first header named `name`, ignoring ASCII case.
#[must_use]
pub fn find<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
