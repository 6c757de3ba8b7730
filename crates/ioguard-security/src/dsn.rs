// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password redaction for connection strings.
//!
//! URL-shaped DSNs are parsed with the `url` crate and the password span is
//! replaced in place, so user, host, port, path and query keep their exact
//! original bytes. Strings the parser rejects (or that lack an authority)
//! fall back to a scan for `user:password@`, and finally for a bare
//! `scheme://:password`. Keyword DSNs (`host=db password=x`) are handled by
//! a regex over `password=`/`pwd=` pairs.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::redact::REDACTED;

static KEYWORD_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(password|pwd)(\s*=\s*)('(?:[^'\\]|\\.)*'|"[^"]*"|[^\s;]+)"#).unwrap()
});

/// Replace the password in `dsn` with `[REDACTED]`.
///
/// Returns the input unchanged (borrowed) when no password is found.
pub fn redact_dsn(dsn: &str) -> Cow<'_, str> {
    if !dsn.contains("://") {
        if let Some(span) = userinfo_fallback(dsn) {
            return splice(dsn, span);
        }
        return redact_keyword_pairs(dsn);
    }

    let span = match url::Url::parse(dsn) {
        Ok(parsed) if parsed.has_authority() => {
            if parsed.password().is_none() {
                return Cow::Borrowed(dsn);
            }
            structured_password_span(dsn)
        }
        _ => userinfo_fallback(dsn).or_else(|| bare_password_span(dsn)),
    };

    match span {
        Some(span) => splice(dsn, span),
        None => Cow::Borrowed(dsn),
    }
}

fn splice(dsn: &str, span: Range<usize>) -> Cow<'_, str> {
    let mut out = String::with_capacity(dsn.len() - span.len() + REDACTED.len());
    out.push_str(&dsn[..span.start]);
    out.push_str(REDACTED);
    out.push_str(&dsn[span.end..]);
    Cow::Owned(out)
}

/// Password span inside the authority of a URL the parser accepted.
fn structured_password_span(dsn: &str) -> Option<Range<usize>> {
    let start = dsn.find("://")? + 3;
    let end = dsn[start..]
        .find(['/', '?', '#'])
        .map_or(dsn.len(), |i| start + i);
    let authority = &dsn[start..end];
    let at = authority.rfind('@')?;
    let colon = authority[..at].find(':')?;
    Some(start + colon + 1..start + at)
}

/// `user:password@host` scan for strings the URL parser rejects.
///
/// The userinfo ends at the last `@` before the first `?` that follows the
/// first `@`, so passwords containing `@` are covered whole. A user part
/// containing `/`, `?` or `#` means this is a path, not credentials.
fn userinfo_fallback(dsn: &str) -> Option<Range<usize>> {
    let start = dsn.find("://").map_or(0, |i| i + 3);
    let rest = &dsn[start..];

    let first_at = rest.find('@')?;
    let limit = rest[first_at..]
        .find('?')
        .map_or(rest.len(), |q| first_at + q);
    let at = rest[..limit].rfind('@')?;
    let colon = rest[..at].find(':')?;
    if rest[..colon].contains(['/', '?', '#']) {
        return None;
    }
    let span = start + colon + 1..start + at;
    (!span.is_empty()).then_some(span)
}

/// `scheme://:password` with no user and no `@`.
fn bare_password_span(dsn: &str) -> Option<Range<usize>> {
    let start = dsn.find("://")? + 3;
    let password = dsn[start..].strip_prefix(':')?;
    let len = password.find(['/', '?']).unwrap_or(password.len());
    let candidate = &password[..len];
    // `http://:8080/` is an empty host with a port.
    if candidate.is_empty() || candidate.parse::<u16>().is_ok() {
        return None;
    }
    Some(start + 1..start + 1 + len)
}

fn redact_keyword_pairs(dsn: &str) -> Cow<'_, str> {
    KEYWORD_PASSWORD.replace_all(dsn, |caps: &regex::Captures<'_>| {
        let value = &caps[3];
        let redacted = match value.as_bytes().first() {
            Some(b'\'') => format!("'{REDACTED}'"),
            Some(b'"') => format!("\"{REDACTED}\""),
            _ => REDACTED.to_string(),
        };
        format!("{}{}{}", &caps[1], &caps[2], redacted)
    })
}
