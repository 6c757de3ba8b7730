// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Environment flag that permits loopback targets when set to `"true"`.
pub const DEFAULT_LOOPBACK_OVERRIDE_ENV: &str = "IOGUARD_ALLOW_LOOPBACK_RESOURCES";

/// Environment flag that permits private-network targets when set to `"true"`.
pub const DEFAULT_PRIVATE_OVERRIDE_ENV: &str = "IOGUARD_ALLOW_PRIVATE_NETWORK_RESOURCES";

/// Top-level ioguard configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IoGuardConfig {
    /// Outbound connection policy.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Outbound connection policy for the connection guard.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Permit loopback targets (127.0.0.0/8, ::1).
    #[serde(default)]
    pub allow_loopback: bool,

    /// Permit private-network targets (RFC 1918, CGNAT, ULA, ...).
    #[serde(default)]
    pub allow_private_network: bool,

    /// Permit link-local targets, including cloud metadata endpoints.
    #[serde(default)]
    pub allow_link_local: bool,

    /// CIDR ranges exempt from the guard (e.g. a known internal service subnet).
    #[serde(default)]
    pub allowed_private_cidrs: Vec<String>,

    /// Name of the environment flag re-read on every check to permit loopback.
    #[serde(default = "default_loopback_override_env")]
    pub loopback_override_env: String,

    /// Name of the environment flag re-read on every check to permit private networks.
    #[serde(default = "default_private_override_env")]
    pub private_network_override_env: String,

    /// Connect timeout for guarded dials, in seconds.
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// Trust `X-Real-IP` / `X-Forwarded-For` when computing client addresses.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_loopback: false,
            allow_private_network: false,
            allow_link_local: false,
            allowed_private_cidrs: Vec::new(),
            loopback_override_env: default_loopback_override_env(),
            private_network_override_env: default_private_override_env(),
            dial_timeout_secs: default_dial_timeout_secs(),
            trust_proxy: false,
        }
    }
}

impl SecurityConfig {
    /// Parse `allowed_private_cidrs`, skipping entries that do not parse.
    ///
    /// Invalid entries are reported by validation; at runtime they are ignored.
    pub fn allowlist(&self) -> Vec<ipnet::IpNet> {
        self.allowed_private_cidrs
            .iter()
            .filter_map(|s| parse_cidr(s))
            .collect()
    }
}

/// Parse a CIDR, accepting a bare address as a single-host network.
pub fn parse_cidr(s: &str) -> Option<ipnet::IpNet> {
    let s = s.trim();
    s.parse::<ipnet::IpNet>()
        .ok()
        .or_else(|| s.parse::<std::net::IpAddr>().ok().map(ipnet::IpNet::from))
}

fn default_loopback_override_env() -> String {
    DEFAULT_LOOPBACK_OVERRIDE_ENV.to_string()
}

fn default_private_override_env() -> String {
    DEFAULT_PRIVATE_OVERRIDE_ENV.to_string()
}

fn default_dial_timeout_secs() -> u64 {
    5
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level for ioguard targets when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
