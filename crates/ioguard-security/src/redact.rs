// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for log output and error messages.
//!
//! Layers applied by [`redact`], in order:
//! 1. **DSN**: passwords in every URL-looking token ([`redact_dsn`]).
//! 2. **Fields**: `key=value` pairs whose key is sensitive.
//! 3. **JSON**: values of sensitive keys in embedded JSON ([`redact_json_str`]).
//! 4. **Patterns**: known token formats (Bearer, `sk-` keys).
//! 5. **Exact match**: runtime-registered secret values.

use std::borrow::Cow;
use std::io::Write;
use std::sync::{Arc, LazyLock, RwLock};

use regex::{Captures, Regex};

use crate::dsn::redact_dsn;
use crate::json_redact::redact_json_str;

/// The redaction placeholder.
pub const REDACTED: &str = "[REDACTED]";

/// Secret values shared between writers and the code that registers them.
pub type SharedSecrets = Arc<RwLock<Vec<String>>>;

/// Key fragments that mark a field as sensitive.
const SENSITIVE_ROOTS: &[&str] = &[
    "api_key",
    "apikey",
    "access_key",
    "private_key",
    "client_secret",
    "secret",
    "token",
    "password",
    "passwd",
    "credential",
    "authorization",
    "auth",
    "session_id",
    "cookie",
];

static REDACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // sk-... style API keys
        Regex::new(r"sk-[a-zA-Z0-9_\-]{20,}").unwrap(),
        Regex::new(r"Bearer\s+[a-zA-Z0-9._\-]{10,}").unwrap(),
    ]
});

static URL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[A-Za-z][A-Za-z0-9+.\-]*://[^\s"'<>]+"#).unwrap());

static KEY_VALUE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b([A-Za-z0-9_.\-]+)=("[^"]*"|[^\s,;]+)"#).unwrap());

/// Whether a JSON key or field name names a secret.
///
/// Case-insensitive substring match against a fixed set of roots. A match
/// only counts when followed by the end of the key, a non-letter, a
/// camel-case transition (`authToken`) or a plural `s` followed by one of
/// those. So `secret_flag`, `AuthToken` and `secrets` are sensitive while
/// `author` and `tokenizer` are not.
pub fn is_sensitive_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    SENSITIVE_ROOTS.iter().any(|root| {
        let root = root.as_bytes();
        bytes
            .windows(root.len())
            .enumerate()
            .any(|(i, window)| window.eq_ignore_ascii_case(root) && is_boundary(bytes, i + root.len(), true))
    })
}

fn is_boundary(key: &[u8], end: usize, allow_plural: bool) -> bool {
    let Some(&next) = key.get(end) else {
        return true;
    };
    if !next.is_ascii_alphabetic() {
        return true;
    }
    if next.is_ascii_uppercase() && key[end - 1].is_ascii_lowercase() {
        return true;
    }
    allow_plural && next.eq_ignore_ascii_case(&b's') && is_boundary(key, end + 1, false)
}

/// Redact secrets from free text.
///
/// `secrets` are exact values replaced longest first.
pub fn redact(input: &str, secrets: &[String]) -> String {
    let mut result = URL_TOKEN
        .replace_all(input, |caps: &Captures<'_>| redact_dsn(&caps[0]).into_owned())
        .into_owned();

    if let Cow::Owned(fields) = KEY_VALUE_FIELD.replace_all(&result, |caps: &Captures<'_>| {
        if is_sensitive_key(&caps[1]) && &caps[2] != REDACTED {
            format!("{}={REDACTED}", &caps[1])
        } else {
            caps[0].to_string()
        }
    }) {
        result = fields;
    }

    if let Cow::Owned(json) = redact_json_str(&result) {
        result = json;
    }

    for pattern in REDACTION_PATTERNS.iter() {
        if let Cow::Owned(replaced) = pattern.replace_all(&result, REDACTED) {
            result = replaced;
        }
    }

    let mut sorted: Vec<&String> = secrets.iter().filter(|s| !s.is_empty()).collect();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for secret in sorted {
        result = result.replace(secret.as_str(), REDACTED);
    }

    result
}

/// Register a secret for exact-match redaction. Duplicates are ignored.
pub fn add_secret(secrets: &SharedSecrets, value: impl Into<String>) {
    let value = value.into();
    if value.is_empty() {
        return;
    }
    if let Ok(mut values) = secrets.write() {
        if !values.contains(&value) {
            values.push(value);
        }
    }
}

/// A writer wrapper that redacts secrets from output.
///
/// Each `write` call is redacted on its own, so callers should hand it
/// whole lines (the tracing fmt layer does).
pub struct RedactingWriter<W> {
    inner: W,
    secrets: SharedSecrets,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, secrets: SharedSecrets) -> Self {
        Self { inner, secrets }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let secrets = self
            .secrets
            .read()
            .map(|v| v.clone())
            .unwrap_or_default();
        let redacted = redact(&input, &secrets);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
