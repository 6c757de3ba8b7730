// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the ioguard connection guard and redaction engine.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `IOGUARD_` environment variable overrides, and
//! miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use ioguard_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("dial timeout: {}s", config.security.dial_timeout_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, render_report, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    IoGuardConfig, LoggingConfig, SecurityConfig, DEFAULT_LOOPBACK_OVERRIDE_ENV,
    DEFAULT_PRIVATE_OVERRIDE_ENV,
};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `IoGuardConfig` or every diagnostic collected
/// while loading and validating.
pub fn load_and_validate() -> Result<IoGuardConfig, Vec<ConfigError>> {
    let result = match loader::load_config() {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    };
    if let Err(errors) = &result {
        tracing::warn!(count = errors.len(), "configuration rejected");
    }
    result
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<IoGuardConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}
