// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redaction of sensitive values in JSON text and `serde_json` values.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::json_walker::{skip_trivia, value_end, Scanner};
use crate::redact::{is_sensitive_key, REDACTED};

const REDACTED_JSON: &[u8] = b"\"[REDACTED]\"";

/// Replace the value of every sensitive key with `"[REDACTED]"`.
///
/// Works on JSON-like text that may contain comments or be malformed: the
/// whole value (string, number, literal, object or array) is replaced,
/// whitespace and comments around it are kept, and the key is left exactly
/// as written. Returns the input slice when nothing was redacted.
pub fn redact_json(input: &[u8]) -> Cow<'_, [u8]> {
    let mut scanner = Scanner::<true>::new(input);
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0;

    while let Some(token) = scanner.next_string() {
        let Some(colon) = token.key_colon else {
            continue;
        };
        if !is_sensitive_key(&unescape_key(&input[token.start..token.end])) {
            continue;
        }

        let start = skip_trivia::<true>(input, colon + 1);
        if start >= input.len() {
            break;
        }
        let end = value_end::<true>(input, start);
        scanner.seek(end);
        if &input[start..end] == REDACTED_JSON {
            continue;
        }

        let buf = out.get_or_insert_with(|| Vec::with_capacity(input.len()));
        buf.extend_from_slice(&input[copied..start]);
        buf.extend_from_slice(REDACTED_JSON);
        copied = end;
    }

    match out {
        Some(mut buf) => {
            buf.extend_from_slice(&input[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(input),
    }
}

/// [`redact_json`] over `str`.
pub fn redact_json_str(input: &str) -> Cow<'_, str> {
    match redact_json(input.as_bytes()) {
        Cow::Borrowed(_) => Cow::Borrowed(input),
        // Only whole ASCII-delimited values are replaced, so UTF-8 survives.
        Cow::Owned(bytes) => Cow::Owned(
            String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        ),
    }
}

/// Decode a raw key literal (quotes included) for the sensitivity check.
fn unescape_key(raw: &[u8]) -> Cow<'_, str> {
    let inner = &raw[1..raw.len() - 1];
    if !inner.contains(&b'\\') {
        return String::from_utf8_lossy(inner);
    }
    serde_json::from_slice::<String>(raw)
        .map(Cow::Owned)
        .unwrap_or_else(|_| String::from_utf8_lossy(inner))
}

/// Deep copy of `value` with every sensitive key's value replaced by
/// `"[REDACTED]"`.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let val = if is_sensitive_key(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(val)
                    };
                    (key.clone(), val)
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}
