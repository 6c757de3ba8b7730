// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-pass walker over the string values of JSON-like text.
//!
//! The walker does not parse JSON. It scans for string literals, skips
//! `//` and `/* */` comments (in the comment-aware variant), and tells keys
//! from values by looking past whitespace and comments for a `:`. Output is
//! copy-on-write: the input slice is returned untouched unless the visitor
//! asks for a replacement.

use std::borrow::Cow;

/// One string literal found by the [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StringToken {
    /// Offset of the opening quote.
    pub start: usize,
    /// Offset just past the closing quote.
    pub end: usize,
    /// Offset of the `:` when this string is an object key.
    pub key_colon: Option<usize>,
}

/// Cursor over JSON-like bytes. `COMMENTS` enables comment skipping.
pub(crate) struct Scanner<'a, const COMMENTS: bool> {
    input: &'a [u8],
    pos: usize,
}

impl<'a, const COMMENTS: bool> Scanner<'a, COMMENTS> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Continue scanning from `pos`.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    /// Next terminated string literal outside comments.
    pub fn next_string(&mut self) -> Option<StringToken> {
        let start = self.next_quote()?;
        let Some(end) = string_end(self.input, start) else {
            self.pos = self.input.len();
            return None;
        };
        self.pos = end;
        Some(StringToken {
            start,
            end,
            key_colon: key_colon::<COMMENTS>(self.input, end),
        })
    }

    fn next_quote(&mut self) -> Option<usize> {
        loop {
            let quote = self.pos + self.input[self.pos..].iter().position(|&b| b == b'"')?;
            if COMMENTS {
                // Every slash between the cursor and the quote may open a
                // comment that hides the quote.
                if let Some(resume) = comment_before(self.input, self.pos, quote) {
                    self.pos = resume;
                    continue;
                }
            }
            return Some(quote);
        }
    }
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn opens_comment(input: &[u8], i: usize) -> bool {
    input[i] == b'/' && matches!(input.get(i + 1), Some(b'/' | b'*'))
}

/// Offset just past the first comment that opens in `from..to`.
fn comment_before(input: &[u8], from: usize, to: usize) -> Option<usize> {
    (from..to)
        .find(|&i| opens_comment(input, i))
        .map(|slash| skip_comment(input, slash))
}

/// Offset just past the comment opening at `slash`. A line comment ends
/// at (not after) its newline; an unterminated comment runs to the end.
pub(crate) fn skip_comment(input: &[u8], slash: usize) -> usize {
    let body = slash + 2;
    match input.get(slash + 1) {
        Some(b'/') => input[body..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(input.len(), |i| body + i),
        Some(b'*') => input[body..]
            .windows(2)
            .position(|w| w == b"*/")
            .map_or(input.len(), |i| body + i + 2),
        _ => slash + 1,
    }
}

/// Offset just past the closing quote of the string opening at `start`.
pub(crate) fn string_end(input: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < input.len() {
        match input[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Skip whitespace and, with `COMMENTS`, comments.
pub(crate) fn skip_trivia<const COMMENTS: bool>(input: &[u8], mut i: usize) -> usize {
    while i < input.len() {
        if is_json_whitespace(input[i]) {
            i += 1;
        } else if COMMENTS && opens_comment(input, i) {
            i = skip_comment(input, i);
        } else {
            break;
        }
    }
    i
}

fn key_colon<const COMMENTS: bool>(input: &[u8], after_string: usize) -> Option<usize> {
    let i = skip_trivia::<COMMENTS>(input, after_string);
    (input.get(i) == Some(&b':')).then_some(i)
}

/// Offset just past the value starting at `start`.
///
/// Strings, objects and arrays are matched structurally (nested strings and
/// comments included); anything else runs to the next delimiter. An
/// unterminated value runs to the end of input.
pub(crate) fn value_end<const COMMENTS: bool>(input: &[u8], start: usize) -> usize {
    match input.get(start) {
        None => start,
        Some(b'"') => string_end(input, start).unwrap_or(input.len()),
        Some(b'{' | b'[') => container_end::<COMMENTS>(input, start),
        Some(_) => scalar_end::<COMMENTS>(input, start),
    }
}

fn container_end<const COMMENTS: bool>(input: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < input.len() {
        match input[i] {
            b'"' => {
                i = string_end(input, i).unwrap_or(input.len());
                continue;
            }
            b'/' if COMMENTS && opens_comment(input, i) => {
                i = skip_comment(input, i);
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    input.len()
}

/// A bare value runs to the next `,`, `}` or `]` outside strings and
/// comments, so malformed input like `abc def` is taken whole. Trailing
/// whitespace and comments are not part of the value.
fn scalar_end<const COMMENTS: bool>(input: &[u8], start: usize) -> usize {
    let mut i = start;
    let mut end = start;
    while i < input.len() {
        match input[i] {
            b',' | b'}' | b']' => break,
            b'"' => {
                i = string_end(input, i).unwrap_or(input.len());
                end = i;
            }
            b'/' if COMMENTS && opens_comment(input, i) => i = skip_comment(input, i),
            b if is_json_whitespace(b) => i += 1,
            _ => {
                i += 1;
                end = i;
            }
        }
    }
    end
}

/// Visit every string value (not key) in JSON text that may contain
/// `//` and `/* */` comments.
///
/// The visitor receives the raw literal, quotes and escapes included, and
/// returns replacement bytes or `None` to keep it. Strings inside comments
/// are never visited. When nothing is replaced the input slice itself is
/// returned.
pub fn walk_json_strings<'a, F>(input: &'a [u8], visit: F) -> Cow<'a, [u8]>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    walk::<true, F>(input, visit)
}

/// Like [`walk_json_strings`] for strict JSON: `/` is ordinary text.
pub fn walk_standard_json_strings<'a, F>(input: &'a [u8], visit: F) -> Cow<'a, [u8]>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    walk::<false, F>(input, visit)
}

fn walk<const COMMENTS: bool, F>(input: &[u8], mut visit: F) -> Cow<'_, [u8]>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    let mut scanner = Scanner::<COMMENTS>::new(input);
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0;

    while let Some(token) = scanner.next_string() {
        if token.key_colon.is_some() {
            continue;
        }
        if let Some(replacement) = visit(&input[token.start..token.end]) {
            let buf = out.get_or_insert_with(|| Vec::with_capacity(input.len()));
            buf.extend_from_slice(&input[copied..token.start]);
            buf.extend_from_slice(&replacement);
            copied = token.end;
        }
    }

    match out {
        Some(mut buf) => {
            buf.extend_from_slice(&input[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<String> {
        let mut seen = Vec::new();
        let _ = walk_json_strings(input.as_bytes(), |raw| {
            seen.push(String::from_utf8_lossy(raw).into_owned());
            None
        });
        seen
    }

    fn uppercase(input: &str) -> String {
        let out = walk_json_strings(input.as_bytes(), |raw| Some(raw.to_ascii_uppercase()));
        String::from_utf8(out.into_owned()).unwrap()
    }

    #[test]
    fn no_change_returns_input_slice() {
        let input = br#"{"key": "value", "list": ["a", "b"]}"#;
        let out = walk_json_strings(input, |_| None);
        assert!(matches!(out, Cow::Borrowed(b) if std::ptr::eq(b, input.as_slice())));
    }

    #[test]
    fn visits_values_not_keys() {
        assert_eq!(collect(r#"{"key": "value"}"#), vec![r#""value""#]);
        assert_eq!(
            collect(r#"{"a": {"b": "c"}, "d": ["e", "f"]}"#),
            vec![r#""c""#, r#""e""#, r#""f""#]
        );
    }

    #[test]
    fn escaped_quote_stays_in_one_string() {
        assert_eq!(collect(r#"{"k": "val\"ue"}"#), vec![r#""val\"ue""#]);
        assert_eq!(collect(r#"{"k": "trailing\\"}"#), vec![r#""trailing\\""#]);
    }

    #[test]
    fn keys_with_comments_before_colon() {
        assert_eq!(collect(r#"{"key" /* c */ : "value"}"#), vec![r#""value""#]);
        assert_eq!(collect("{\"key\" // c\n : \"value\"}"), vec![r#""value""#]);
        assert_eq!(collect(r#"{"key": "value" /* trailing */}"#), vec![r#""value""#]);
    }

    #[test]
    fn strings_inside_comments_are_hidden() {
        assert_eq!(
            collect(r#"{"a": /* "hidden" */ "shown"}"#),
            vec![r#""shown""#]
        );
        assert_eq!(
            collect("{\"a\": 1, // \"hidden\"\n \"b\": \"shown\"}"),
            vec![r#""shown""#]
        );
    }

    #[test]
    fn division_before_comment() {
        assert_eq!(collect("{\"a\": 1 / 2 // \"commented\"\n}"), Vec::<String>::new());
        assert_eq!(collect(r#"{"a": 1 / 2 /* "commented" */}"#), Vec::<String>::new());
        assert_eq!(collect(r#"{"a": 1 / 2, "b": "x"}"#), vec![r#""x""#]);
        assert_eq!(
            collect("{\"key\": 1 / 2 // \"commented\"\n, \"k2\": \"v2\"}"),
            vec![r#""v2""#]
        );
    }

    #[test]
    fn comment_markers_inside_strings_are_text() {
        assert_eq!(
            collect(r#"{"url": "http://example.com/*path*/", "n": "y"}"#),
            vec![r#""http://example.com/*path*/""#, r#""y""#]
        );
    }

    #[test]
    fn standard_variant_treats_slashes_as_text() {
        let mut seen = Vec::new();
        let _ = walk_standard_json_strings(br#"{"u": "http://x/y", "p": "a\/b"}"#, |raw| {
            seen.push(raw.to_vec());
            None
        });
        assert_eq!(seen, vec![br#""http://x/y""#.to_vec(), br#""a\/b""#.to_vec()]);

        // Without comment support a quote after `//` is a real string.
        let mut count = 0;
        let _ = walk_standard_json_strings(b"[1 // \"x\"\n]", |_| {
            count += 1;
            None
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn replacement_preserves_surroundings() {
        assert_eq!(
            uppercase(r#"{ "key" : "value" , /* "c" */ "n": [ "a" ] }"#),
            r#"{ "key" : "VALUE" , /* "c" */ "n": [ "A" ] }"#
        );
    }

    #[test]
    fn unterminated_string_is_left_alone() {
        assert_eq!(uppercase(r#"{"a": "b", "c": "unterminated"#), r#"{"a": "B", "c": "unterminated"#);
    }

    #[test]
    fn unterminated_block_comment_hides_rest() {
        assert_eq!(collect(r#"{"a": /* "x", "b": "y"}"#), Vec::<String>::new());
    }

    #[test]
    fn value_end_handles_nested_comments() {
        let input = br#"[1, /* ] */ "]", {"a": [2]}] tail"#;
        let end = value_end::<true>(input, 0);
        assert_eq!(&input[end..], b" tail");
    }

    #[test]
    fn bare_value_stops_before_trailing_trivia() {
        let input = b"abc def /* , */ \n, next";
        let end = value_end::<true>(input, 0);
        assert_eq!(&input[..end], b"abc def");
        let input = b"true}";
        assert_eq!(value_end::<false>(input, 0), 4);
    }
}
