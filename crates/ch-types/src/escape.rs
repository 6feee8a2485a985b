//! Escaping of string literals embedded in array parameters.
//!
//! ClickHouse parses array parameters with its literal parser, so string
//! elements are quoted with `'` and the two bytes that are significant inside
//! a quoted literal are escaped:
//!
//! | Byte | Escaped |
//! |------|---------|
//! | `'`  | `\'`    |
//! | `\`  | `\\`    |
//!
//! The input is treated as opaque bytes. Multi-byte UTF-8 sequences never
//! contain either byte, so they pass through untouched.
//!
//! Escaping is done in a single forward scan. [`segments`] yields borrowed
//! runs of the input interleaved with escape sequences, and [`escape`] only
//! allocates when the input actually contains a byte that needs escaping.

use std::borrow::Cow;

/// Escape sequence for `byte`, or `None` if it is emitted as-is.
#[inline]
fn replacement(byte: u8) -> Option<&'static [u8]> {
    match byte {
        b'\'' => Some(b"\\'"),
        b'\\' => Some(b"\\\\"),
        _ => None,
    }
}

/// Check whether `input` contains any byte that must be escaped.
#[must_use]
pub fn needs_escaping(input: &[u8]) -> bool {
    input.iter().any(|&b| replacement(b).is_some())
}

/// Iterator over the pieces of an escaped byte string.
///
/// Unescaped runs are yielded as slices of the original input; escape
/// sequences are yielded as static slices. Concatenating every item gives the
/// escaped form.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    input: &'a [u8],
    /// Scan cursor: start of the next unescaped run.
    pos: usize,
    /// Escape sequence owed after the run that was just yielded.
    pending: Option<&'static [u8]>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(seq) = self.pending.take() {
            return Some(seq);
        }

        let rest = self.input.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }

        match rest.iter().position(|&b| replacement(b).is_some()) {
            Some(offset) => {
                let at = self.pos + offset;
                let seq = replacement(self.input[at]);
                self.pos = at + 1;
                if offset == 0 {
                    seq
                } else {
                    self.pending = seq;
                    Some(&rest[..offset])
                }
            }
            None => {
                self.pos = self.input.len();
                Some(rest)
            }
        }
    }
}

/// Split `input` into escaped segments without copying it.
#[must_use]
pub fn segments(input: &[u8]) -> Segments<'_> {
    Segments {
        input,
        pos: 0,
        pending: None,
    }
}

/// Escape `input`, borrowing it unchanged when nothing needs escaping.
#[must_use]
pub fn escape(input: &[u8]) -> Cow<'_, [u8]> {
    let extra = input
        .iter()
        .filter(|&&b| replacement(b).is_some())
        .count();
    if extra == 0 {
        return Cow::Borrowed(input);
    }

    let mut out = Vec::with_capacity(input.len() + extra);
    out.extend(segments(input).flatten());
    Cow::Owned(out)
}

/// Append the escaped form of `input` to `out`.
pub fn escape_into(input: &[u8], out: &mut Vec<u8>) {
    for segment in segments(input) {
        out.extend_from_slice(segment);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quote_and_backslash() {
        assert_eq!(&*escape(b"it's"), b"it\\'s");
        assert_eq!(&*escape(b"a\\b"), b"a\\\\b");
        assert_eq!(&*escape(b"'\\'"), b"\\'\\\\\\'");
    }

    #[test]
    fn test_escape_borrows_when_clean() {
        let input = b"plain text";
        assert!(matches!(escape(input), Cow::Borrowed(s) if s.as_ptr() == input.as_ptr()));
        assert!(matches!(escape(b""), Cow::Borrowed(_)));
    }

    #[test]
    fn test_segments_reference_input() {
        let input = b"ab'cd";
        let parts: Vec<&[u8]> = segments(input).collect();
        assert_eq!(parts, vec![&b"ab"[..], &b"\\'"[..], &b"cd"[..]]);
        // Unescaped runs point into the original buffer.
        assert_eq!(parts[0].as_ptr(), input.as_ptr());
        assert_eq!(parts[2].as_ptr(), input[3..].as_ptr());
    }

    #[test]
    fn test_segments_leading_and_trailing_escapes() {
        let parts: Vec<&[u8]> = segments(b"'x\\").collect();
        assert_eq!(parts, vec![&b"\\'"[..], &b"x"[..], &b"\\\\"[..]]);
    }

    #[test]
    fn test_multibyte_text_untouched() {
        let input = "naïve 'ünïcödé' ✓".as_bytes();
        let escaped = escape(input);
        assert_eq!(
            std::str::from_utf8(&escaped).unwrap(),
            "naïve \\'ünïcödé\\' ✓"
        );
    }

    #[test]
    fn test_escape_into_appends() {
        let mut out = b"['".to_vec();
        escape_into(b"o'k", &mut out);
        assert_eq!(out, b"['o\\'k");
        assert!(needs_escaping(b"o'k"));
        assert!(!needs_escaping(b"ok"));
    }
}
