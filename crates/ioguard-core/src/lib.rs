// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the ioguard workspace.
//!
//! Holds the error type shared by the configuration and security crates so
//! callers embedding the guard can handle every failure through one enum.

pub mod error;

pub use error::IoGuardError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_guard_error_has_all_variants() {
        let _config = IoGuardError::Config("test".into());
        let _security = IoGuardError::Security("test".into());
        let _io = IoGuardError::Io {
            context: "dial".into(),
            source: std::io::Error::other("test"),
        };
        let _interrupted = IoGuardError::Interrupted("deadline exceeded".into());
        let _internal = IoGuardError::Internal("test".into());
    }

    #[test]
    fn io_error_display_includes_context() {
        let err = IoGuardError::Io {
            context: "connect to 10.0.0.1:80".into(),
            source: std::io::Error::other("refused"),
        };
        assert_eq!(err.to_string(), "I/O error (connect to 10.0.0.1:80): refused");
    }

    #[test]
    fn security_predicate() {
        assert!(IoGuardError::Security("blocked".into()).is_security());
        assert!(!IoGuardError::Config("bad".into()).is_security());
    }
}
