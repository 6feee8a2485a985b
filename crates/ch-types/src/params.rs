//! Query parameter collections and their wire names.
//!
//! ClickHouse binds `{name:Type}` placeholders from `param_<name>` entries in
//! the HTTP query string. Keyed parameters keep their key; positional
//! parameters are named `$0`, `$1`, ... so a statement refers to them as
//! `{$0:Type}`.

use bytes::Bytes;

use crate::encode::encode_value;
use crate::to_param::ToParam;
use crate::value::Value;

/// Prefix ClickHouse expects in front of every parameter name.
pub const PARAM_PREFIX: &str = "param_";

/// A parameter ready to be placed in the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedParam {
    /// Wire name, including the `param_` prefix.
    pub name: String,
    /// Encoded value text.
    pub value: Bytes,
}

impl EncodedParam {
    /// Borrow the name/value pair.
    #[must_use]
    pub fn as_pair(&self) -> (&str, &[u8]) {
        (&self.name, &self.value)
    }
}

/// Parameters bound to a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// No parameters.
    #[default]
    None,
    /// Parameters addressed by name.
    Named(Vec<(String, Value)>),
    /// Parameters addressed by zero-based position.
    Positional(Vec<Value>),
}

impl Params {
    /// Build named parameters from key/value pairs, keeping their order.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build positional parameters from borrowed values.
    #[must_use]
    pub fn positional(values: &[&dyn ToParam]) -> Self {
        Self::Positional(values.iter().map(|v| v.to_param()).collect())
    }

    /// Get the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Named(v) => v.len(),
            Self::Positional(v) => v.len(),
        }
    }

    /// Check if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode every parameter into its wire name and value text.
    #[must_use]
    pub fn encode(&self) -> Vec<EncodedParam> {
        match self {
            Self::None => Vec::new(),
            Self::Named(pairs) => pairs
                .iter()
                .map(|(key, value)| EncodedParam {
                    name: format!("{PARAM_PREFIX}{key}"),
                    value: encode_value(value),
                })
                .collect(),
            Self::Positional(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| EncodedParam {
                    name: format!("{PARAM_PREFIX}${i}"),
                    value: encode_value(value),
                })
                .collect(),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<&[&dyn ToParam]> for Params {
    fn from(values: &[&dyn ToParam]) -> Self {
        Self::positional(values)
    }
}

impl FromIterator<(String, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::Named(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_param_name() {
        let encoded = Params::named([("limit", 10i32)]).encode();
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].as_pair(), ("param_limit", &b"10"[..]));
    }

    #[test]
    fn test_positional_param_names() {
        let encoded = Params::positional(&[&"x", &"y"]).encode();
        let pairs: Vec<(&str, &[u8])> = encoded.iter().map(EncodedParam::as_pair).collect();
        assert_eq!(pairs, vec![("param_$0", &b"x"[..]), ("param_$1", &b"y"[..])]);
    }

    #[test]
    fn test_positional_array() {
        let list: Vec<&dyn ToParam> = vec![&"a", &"it's", &3i32];
        let encoded = Params::positional(&[&Value::Array(
            list.iter().map(|v| v.to_param()).collect(),
        )])
        .encode();
        assert_eq!(encoded[0].value, Bytes::from_static(b"['a','it\\'s',3]"));
    }

    #[test]
    fn test_empty() {
        assert!(Params::None.encode().is_empty());
        assert!(Params::default().is_empty());
        assert_eq!(Params::from(vec![Value::Int(1)]).len(), 1);
    }
}
