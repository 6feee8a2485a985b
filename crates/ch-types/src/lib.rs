//! # ch-types
//!
//! ClickHouse parameter values and their HTTP wire encoding.
//!
//! This crate is IO-free. It maps Rust values to the text ClickHouse expects
//! in `param_<name>` query-string entries, including recursive array
//! encoding and binary-safe escaping of string literals.
//!
//! ## Features
//!
//! - `chrono` (default): Enable date/time parameters via chrono
//! - `uuid` (default): Enable UUID parameters
//! - `decimal` (default): Enable decimal parameters via rust_decimal
//!
//! ## Encoding Rules
//!
//! | Value | Top level | Inside an array |
//! |-------|-----------|-----------------|
//! | integer | `42` | `42` |
//! | float | `0.1` | `0.1` |
//! | `Decimal` | `1234.5600` | `1234.5600` |
//! | `NaiveDate` | `2024-02-29` | `2024-02-29` |
//! | `NaiveDateTime` | `2024-02-29T13:05:09` | `2024-02-29T13:05:09` |
//! | string | `it's` | `'it\'s'` |
//! | NULL | `\N` | `NULL` |
//! | array | `[1,2]` | `[1,2]` |
//!
//! ## Example
//!
//! ```
//! use ch_types::{Params, Value};
//!
//! let params = Params::named([("tags", Value::from(vec!["a", "it's"]))]);
//! let encoded = params.encode();
//! assert_eq!(encoded[0].name, "param_tags");
//! assert_eq!(&encoded[0].value[..], b"['a','it\\'s']");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod encode;
pub mod escape;
pub mod params;
pub mod to_param;
pub mod value;

pub use encode::{encode_value, encode_value_into};
pub use escape::{escape, escape_into, segments};
pub use params::{EncodedParam, PARAM_PREFIX, Params};
pub use to_param::ToParam;
pub use value::Value;
