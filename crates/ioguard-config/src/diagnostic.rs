// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostics for rejected configuration.
//!
//! Figment errors and validation failures both end up as [`ConfigError`]
//! values, rendered through miette so operators see the offending key, the
//! value and a hint.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use ioguard_core::IoGuardError;
use miette::{Diagnostic, GraphicalReportHandler};
use thiserror::Error;

/// Keys scoring below this Jaro-Winkler similarity get no suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// Rejected by `deny_unknown_fields`.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(ioguard::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(ioguard::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(ioguard::config::missing_key),
        help("add `{key}` to the [security] or [logging] table")
    )]
    MissingKey { key: String },

    /// An allowlist entry that is neither a CIDR nor a bare address.
    #[error("invalid network `{value}` in `{key}`")]
    #[diagnostic(
        code(ioguard::config::invalid_cidr),
        help("use CIDR notation such as `10.20.0.0/16` or `fd00::/8`, or a single address")
    )]
    InvalidCidr { key: String, value: String },

    /// Parsed fine but semantically unusable.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(ioguard::config::invalid_value))]
    InvalidValue { key: String, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(ioguard::config::other))]
    Other(String),
}

impl ConfigError {
    /// Dotted key the error refers to, if it names one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownKey { key, .. }
            | Self::InvalidType { key, .. }
            | Self::MissingKey { key }
            | Self::InvalidCidr { key, .. }
            | Self::InvalidValue { key, .. } => Some(key),
            Self::Other(_) => None,
        }
    }
}

impl From<ConfigError> for IoGuardError {
    fn from(err: ConfigError) -> Self {
        IoGuardError::Config(err.to_string())
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

fn dotted_path(path: &[String], leaf: Option<&str>) -> String {
    path.iter()
        .map(String::as_str)
        .chain(leaf)
        .collect::<Vec<_>>()
        .join(".")
}

/// Convert a `figment::Error` into one `ConfigError` per underlying failure.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => ConfigError::UnknownKey {
                key: dotted_path(&error.path, Some(field.as_str())),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
            },
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: dotted_path(&error.path, Some(&**field)),
            },
            Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                key: dotted_path(&error.path, None),
                found: found.to_string(),
                expected: expected.clone(),
            },
            Kind::InvalidValue(found, expected) => ConfigError::InvalidValue {
                key: dotted_path(&error.path, None),
                message: format!("found {found}, expected {expected}"),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Closest valid key by Jaro-Winkler similarity, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render every error with miette's graphical handler into one report.
pub fn render_report(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => out.push_str(&buf),
            Err(_) => out.push_str(&format!("Error: {error}\n")),
        }
    }
    out
}

/// Print [`render_report`] to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_report(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_allow_loopbak_for_allow_loopback() {
        let valid = &["allow_loopback", "allow_link_local", "trust_proxy"];
        assert_eq!(
            suggest_key("allow_loopbak", valid),
            Some("allow_loopback".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["allow_loopback", "trust_proxy"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn invalid_cidr_names_the_entry() {
        let err = ConfigError::InvalidCidr {
            key: "security.allowed_private_cidrs[0]".into(),
            value: "10.0.0.0/33".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid network `10.0.0.0/33` in `security.allowed_private_cidrs[0]`"
        );
        assert_eq!(err.key(), Some("security.allowed_private_cidrs[0]"));
    }

    #[test]
    fn converts_into_workspace_error() {
        let err: IoGuardError = ConfigError::InvalidValue {
            key: "logging.level".into(),
            message: "`loud` is not a level".into(),
        }
        .into();
        assert!(matches!(
            &err,
            IoGuardError::Config(msg) if msg == "invalid value for `logging.level`: `loud` is not a level"
        ));
        assert!(!err.is_security());
    }

    #[test]
    fn dotted_path_appends_leaf() {
        let path = vec!["security".to_string()];
        assert_eq!(dotted_path(&path, Some("allow_loopbak")), "security.allow_loopbak");
        assert_eq!(dotted_path(&path, None), "security");
    }

    #[test]
    fn report_mentions_code_and_help() {
        let report = render_report(&[ConfigError::InvalidCidr {
            key: "security.allowed_private_cidrs[0]".into(),
            value: "nope".into(),
        }]);
        assert!(report.contains("invalid_cidr"));
        assert!(report.contains("CIDR notation"));
    }
}
