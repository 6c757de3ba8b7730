// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the ioguard workspace.

use thiserror::Error;

/// The primary error type returned across crate boundaries.
#[derive(Debug, Error)]
pub enum IoGuardError {
    /// Configuration errors (invalid TOML, bad CIDR, unknown log level).
    #[error("configuration error: {0}")]
    Config(String),

    /// A security policy rejected the operation (SSRF block, invalid target).
    #[error("security error: {0}")]
    Security(String),

    /// Network or file I/O failed for a reason unrelated to policy.
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// The operation was cancelled or ran past its deadline.
    #[error("operation interrupted: {0}")]
    Interrupted(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IoGuardError {
    /// Returns `true` when the error was raised by a security policy decision.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }
}
