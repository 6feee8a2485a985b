//! Text encoding of parameter values.
//!
//! ClickHouse receives query parameters as `param_<name>=<text>` pairs in the
//! HTTP query string and parses the text according to the type declared in
//! the `{name:Type}` placeholder. This module produces that text.
//!
//! Top-level values are sent verbatim: strings are neither quoted nor escaped
//! because the server reads the whole parameter as the string. Inside arrays
//! the server uses its literal parser, so string elements are quoted with `'`
//! and escaped (see [`crate::escape`]).

use bytes::Bytes;

use crate::escape::escape_into;
use crate::value::Value;

/// Text sent for a top-level NULL parameter.
pub const NULL_PARAM: &[u8] = b"\\N";

/// Text sent for a NULL element inside an array parameter.
pub const NULL_ELEMENT: &[u8] = b"NULL";

/// Encode a value as a top-level parameter.
#[must_use]
pub fn encode_value(value: &Value) -> Bytes {
    let mut out = Vec::new();
    encode_value_into(value, &mut out);
    Bytes::from(out)
}

/// Append the top-level encoding of `value` to `out`.
pub fn encode_value_into(value: &Value, out: &mut Vec<u8>) {
    encode(value, out, false);
}

fn encode(value: &Value, out: &mut Vec<u8>, in_array: bool) {
    let text = match value {
        Value::Null if in_array => return out.extend_from_slice(NULL_ELEMENT),
        Value::Null => return out.extend_from_slice(NULL_PARAM),
        Value::String(s) => return encode_string(s.as_bytes(), out, in_array),
        Value::Bytes(b) => return encode_string(b, out, in_array),
        Value::Array(items) => return encode_array(items, out),
        Value::Bool(true) => "true".to_owned(),
        Value::Bool(false) => "false".to_owned(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => format_float(*v),
        #[cfg(feature = "decimal")]
        Value::Decimal(v) => v.to_string(),
        #[cfg(feature = "chrono")]
        Value::Date(v) => v.format("%Y-%m-%d").to_string(),
        #[cfg(feature = "chrono")]
        Value::DateTime(v) => v.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        #[cfg(feature = "uuid")]
        Value::Uuid(v) => v.hyphenated().to_string(),
    };
    out.extend_from_slice(text.as_bytes());
}

fn encode_array(items: &[Value], out: &mut Vec<u8>) {
    out.push(b'[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        encode(item, out, true);
    }
    out.push(b']');
}

fn encode_string(raw: &[u8], out: &mut Vec<u8>, in_array: bool) {
    if in_array {
        out.push(b'\'');
        escape_into(raw, out);
        out.push(b'\'');
    } else {
        out.extend_from_slice(raw);
    }
}

/// Shortest text that parses back to the same float.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_owned()
    } else {
        // Display is shortest round-trip and prints `inf` / `-inf`.
        v.to_string()
    }
}
