//! ClickHouse value representation.

use bytes::Bytes;

/// A value that can be bound as a query parameter or produced by a row
/// decoder.
///
/// String-like data comes in two flavours: [`Value::String`] for UTF-8 text
/// and [`Value::Bytes`] for arbitrary byte strings. ClickHouse `String`
/// columns are byte strings, so both encode identically on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value (Bool).
    Bool(bool),
    /// Signed integer (Int8 through Int64).
    Int(i64),
    /// Unsigned integer (UInt8 through UInt64).
    UInt(u64),
    /// Floating point (Float32, Float64).
    Float(f64),
    /// Decimal value (Decimal32 through Decimal128).
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// Date value (Date, Date32).
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// Date and time without a zone (DateTime, DateTime64).
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
    /// UUID value.
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    /// UTF-8 string (String).
    String(String),
    /// Binary-safe string (String, FixedString).
    Bytes(Bytes),
    /// Array of values, possibly nested.
    Array(Vec<Value>),
}

impl Value {
    /// Get the value as an i64, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get the value as a u64, if it is one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is valid UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            Self::Bytes(v) => std::str::from_utf8(v).ok(),
            _ => None,
        }
    }

    /// Get the elements of an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Check if the value is string-like and must be quoted inside arrays.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_) | Self::Bytes(_))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Int(i64::from(v))
            }
        }
    )*};
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::UInt(u64::from(v))
            }
        }
    )*};
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

#[cfg(feature = "decimal")]
impl From<rust_decimal::Decimal> for Value {
    fn from(v: rust_decimal::Decimal) -> Self {
        Self::Decimal(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDate> for Value {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Date(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

/// Zoned timestamps keep their wall-clock time and drop the zone.
#[cfg(feature = "chrono")]
impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for Value {
    fn from(v: chrono::DateTime<Tz>) -> Self {
        Self::DateTime(v.naive_local())
    }
}
