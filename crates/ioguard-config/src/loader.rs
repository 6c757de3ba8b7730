// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ioguard.toml` > `~/.config/ioguard/ioguard.toml` > `/etc/ioguard/ioguard.toml`
//! with environment variable overrides via the `IOGUARD_SECURITY_` and `IOGUARD_LOGGING_` prefixes.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::IoGuardConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ioguard/ioguard.toml` (system-wide)
/// 3. `~/.config/ioguard/ioguard.toml` (user XDG config)
/// 4. `./ioguard.toml` (local directory)
/// 5. `IOGUARD_SECURITY_*` / `IOGUARD_LOGGING_*` environment variables
pub fn load_config() -> Result<IoGuardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<IoGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IoGuardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<IoGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IoGuardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(IoGuardConfig::default()))
        .merge(Toml::file("/etc/ioguard/ioguard.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ioguard/ioguard.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ioguard.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `IOGUARD_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores. Only the known section prefixes pass the filter: the runtime
/// override flags (`IOGUARD_ALLOW_*`) share the prefix but are not config keys.
fn env_provider() -> Env {
    Env::prefixed("IOGUARD_")
        .filter(|key| {
            let key = key.as_str().to_ascii_lowercase();
            key.starts_with("security_") || key.starts_with("logging_")
        })
        .map(|key| {
            key.as_str()
                .to_ascii_lowercase()
                .replacen("security_", "security.", 1)
                .replacen("logging_", "logging.", 1)
                .into()
        })
}
