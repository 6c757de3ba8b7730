// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{parse_cidr, IoGuardConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every validation error instead of failing fast.
pub fn validate_config(config: &IoGuardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let security = &config.security;

    for (i, cidr) in security.allowed_private_cidrs.iter().enumerate() {
        if parse_cidr(cidr).is_none() {
            errors.push(ConfigError::InvalidCidr {
                key: format!("security.allowed_private_cidrs[{i}]"),
                value: cidr.clone(),
            });
        }
    }

    if security.dial_timeout_secs == 0 {
        errors.push(ConfigError::InvalidValue {
            key: "security.dial_timeout_secs".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }

    for (name, value) in [
        ("loopback_override_env", &security.loopback_override_env),
        ("private_network_override_env", &security.private_network_override_env),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::InvalidValue {
                key: format!("security.{name}"),
                message: "environment variable name must not be empty".to_string(),
            });
        }
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::InvalidValue {
            key: "logging.level".to_string(),
            message: format!(
                "`{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
