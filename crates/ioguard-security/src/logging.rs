// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup with redacted output.

use std::io;

use ioguard_config::LoggingConfig;
use ioguard_core::IoGuardError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::redact::{RedactingWriter, SharedSecrets};

/// Produces a [`RedactingWriter`] over stderr for every formatted event.
#[derive(Clone, Default)]
pub struct RedactingMakeWriter {
    secrets: SharedSecrets,
}

impl RedactingMakeWriter {
    pub fn new(secrets: SharedSecrets) -> Self {
        Self { secrets }
    }

    /// Handle for registering secrets after the subscriber is installed.
    pub fn secrets(&self) -> SharedSecrets {
        self.secrets.clone()
    }
}

impl<'a> MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(io::stderr(), self.secrets.clone())
    }
}

/// Build the default filter: `RUST_LOG` wins, else `ioguard=<level>,warn`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ioguard={},warn", config.level)))
}

/// Install the global subscriber. Returns the shared secret list used by
/// the redacting writer.
pub fn init_tracing(config: &LoggingConfig) -> Result<SharedSecrets, IoGuardError> {
    let writer = RedactingMakeWriter::default();
    let secrets = writer.secrets();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .with_thread_names(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| IoGuardError::Internal(format!("failed to install tracing subscriber: {e}")))?;

    Ok(secrets)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::redact::add_secret;

    #[test]
    fn make_writer_shares_secret_list() {
        let make = RedactingMakeWriter::default();
        add_secret(&make.secrets(), "s3cr3t");
        assert_eq!(make.secrets().read().unwrap().as_slice(), ["s3cr3t".to_string()]);
        let mut writer = make.make_writer();
        writer.flush().unwrap();
    }
}
