//! Trait for converting Rust types to parameter values.

use bytes::Bytes;

use crate::value::Value;

/// Trait for types that can be bound as query parameters.
///
/// This trait is object safe so heterogeneous positional parameters can be
/// passed as `&[&dyn ToParam]`:
///
/// ```
/// use ch_types::{Params, ToParam};
///
/// let params = Params::positional(&[&1u8, &"it's", &vec![1.5f64, 2.0]]);
/// assert_eq!(params.len(), 3);
/// ```
pub trait ToParam {
    /// Convert this value to a parameter value.
    fn to_param(&self) -> Value;
}

impl ToParam for Value {
    fn to_param(&self) -> Value {
        self.clone()
    }
}

impl ToParam for bool {
    fn to_param(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! to_param_via_from {
    ($($t:ty),*) => {$(
        impl ToParam for $t {
            fn to_param(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

to_param_via_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl ToParam for str {
    fn to_param(&self) -> Value {
        Value::String(self.to_owned())
    }
}

impl ToParam for String {
    fn to_param(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToParam for Bytes {
    fn to_param(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<T: ToParam + ?Sized> ToParam for &T {
    fn to_param(&self) -> Value {
        (**self).to_param()
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Value {
        match self {
            Some(v) => v.to_param(),
            None => Value::Null,
        }
    }
}

impl<T: ToParam> ToParam for [T] {
    fn to_param(&self) -> Value {
        Value::Array(self.iter().map(ToParam::to_param).collect())
    }
}

impl<T: ToParam> ToParam for Vec<T> {
    fn to_param(&self) -> Value {
        self.as_slice().to_param()
    }
}

#[cfg(feature = "decimal")]
impl ToParam for rust_decimal::Decimal {
    fn to_param(&self) -> Value {
        Value::Decimal(*self)
    }
}

#[cfg(feature = "uuid")]
impl ToParam for uuid::Uuid {
    fn to_param(&self) -> Value {
        Value::Uuid(*self)
    }
}

#[cfg(feature = "chrono")]
impl ToParam for chrono::NaiveDate {
    fn to_param(&self) -> Value {
        Value::Date(*self)
    }
}

#[cfg(feature = "chrono")]
impl ToParam for chrono::NaiveDateTime {
    fn to_param(&self) -> Value {
        Value::DateTime(*self)
    }
}

#[cfg(feature = "chrono")]
impl<Tz: chrono::TimeZone> ToParam for chrono::DateTime<Tz> {
    fn to_param(&self) -> Value {
        Value::DateTime(self.naive_local())
    }
}
