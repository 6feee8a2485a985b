//! Parameter encoding and escaping properties.
//!
//! Covers:
//! - Escaping round-trips through the server's inverse mapping
//! - Escaping leaves clean input untouched
//! - Array parameters quote and escape string elements

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::borrow::Cow;

use ch_types::{Params, ToParam, Value, escape, segments};
use proptest::prelude::*;

/// Inverse of the escape table: `\'` -> `'`, `\\` -> `\`.
fn unescape(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut iter = input.iter().copied();
    while let Some(b) = iter.next() {
        if b == b'\\' {
            match iter.next() {
                Some(next @ (b'\'' | b'\\')) => out.push(next),
                other => panic!("dangling escape followed by {other:?}"),
            }
        } else {
            out.push(b);
        }
    }
    out
}

// ============================================================================
// Escaping Properties
// ============================================================================

mod escaping {
    use super::*;

    proptest! {
        #[test]
        fn escape_round_trips(input in proptest::collection::vec(any::<u8>(), 0..512)) {
            let escaped = escape(&input);
            prop_assert_eq!(unescape(&escaped), input);
        }

        #[test]
        fn escape_is_noop_without_special_bytes(
            input in proptest::collection::vec(any::<u8>().prop_filter("special", |b| *b != b'\'' && *b != b'\\'), 0..512)
        ) {
            let escaped = escape(&input);
            prop_assert!(matches!(escaped, Cow::Borrowed(_)));
            prop_assert_eq!(&*escaped, &input[..]);
        }

        #[test]
        fn segments_concatenate_to_escape(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let joined: Vec<u8> = segments(&input).flatten().copied().collect();
            let expected = escape(&input);
            prop_assert_eq!(&joined[..], &*expected);
        }

        #[test]
        fn escaped_string_has_no_bare_quote(s in ".*") {
            let escaped = escape(s.as_bytes());
            let mut prev_backslash = false;
            for &b in escaped.iter() {
                if b == b'\'' {
                    prop_assert!(prev_backslash);
                }
                prev_backslash = b == b'\\' && !prev_backslash;
            }
        }
    }

    #[test]
    fn test_only_special_bytes() {
        assert_eq!(&*escape(b"''\\\\"), b"\\'\\'\\\\\\\\");
        assert_eq!(unescape(&escape(b"''\\\\")), b"''\\\\");
    }
}

// ============================================================================
// Parameter Naming and Arrays
// ============================================================================

mod parameters {
    use super::*;

    #[test]
    fn test_array_parameter_encoding() {
        let list: [&dyn ToParam; 3] = [&"a", &"it's", &3i32];
        let array = Value::Array(list.iter().map(|v| v.to_param()).collect());
        let encoded = Params::positional(&[&array]).encode();
        assert_eq!(&encoded[0].value[..], b"['a','it\\'s',3]");
    }

    #[test]
    fn test_keyed_parameter_naming() {
        let encoded = Params::named([("limit", 10i32)]).encode();
        assert_eq!(encoded[0].as_pair(), ("param_limit", &b"10"[..]));
    }

    #[test]
    fn test_positional_parameter_naming() {
        let encoded = Params::positional(&[&"x", &"y"]).encode();
        assert_eq!(encoded[0].as_pair(), ("param_$0", &b"x"[..]));
        assert_eq!(encoded[1].as_pair(), ("param_$1", &b"y"[..]));
    }

    #[test]
    fn test_binary_string_in_array() {
        let value = Value::Array(vec![Value::Bytes(bytes::Bytes::from_static(b"\xff'\x00"))]);
        let encoded = Params::named([("b", value)]).encode();
        assert_eq!(&encoded[0].value[..], b"['\xff\\'\x00']");
    }

    #[test]
    fn test_vec_to_param_nests() {
        let nested = vec![vec!["o'k"], vec![]];
        let encoded = Params::positional(&[&nested]).encode();
        assert_eq!(&encoded[0].value[..], b"[['o\\'k'],[]]");
    }
}
