// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Egress policy: which address categories may be contacted.
//!
//! The static flags come from configuration. On top of those an
//! [`OverrideSource`] is consulted on every check, so operators can flip
//! an override at runtime without rebuilding the guard.

use std::net::IpAddr;
use std::sync::Arc;

use ioguard_config::{SecurityConfig, DEFAULT_LOOPBACK_OVERRIDE_ENV, DEFAULT_PRIVATE_OVERRIDE_ENV};
use ipnet::IpNet;
use tracing::{debug, error, info};

use crate::classify::Classifier;
use crate::error::GuardError;
use crate::ranges::Category;

/// Environment flag that permits both loopback and private-network targets.
pub const DANGEROUS_ALLOW_LOCAL_IPS_ENV: &str = "IOGUARD_DANGEROUS_ALLOW_LOCAL_IPS";

/// Runtime overrides read at check time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub allow_loopback: bool,
    pub allow_private_network: bool,
}

/// Query for the current runtime overrides.
pub trait OverrideSource: Send + Sync {
    fn current(&self) -> Overrides;
}

impl<F> OverrideSource for F
where
    F: Fn() -> Overrides + Send + Sync,
{
    fn current(&self) -> Overrides {
        self()
    }
}

/// Never overrides anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl OverrideSource for NoOverrides {
    fn current(&self) -> Overrides {
        Overrides::default()
    }
}

/// Reads override flags from environment variables on every call.
///
/// Only the exact value `"true"` enables a flag.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    loopback_var: String,
    private_network_var: String,
    combined_var: Option<String>,
}

impl EnvOverrides {
    pub fn new(loopback_var: impl Into<String>, private_network_var: impl Into<String>) -> Self {
        Self {
            loopback_var: loopback_var.into(),
            private_network_var: private_network_var.into(),
            combined_var: None,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            config.loopback_override_env.clone(),
            config.private_network_override_env.clone(),
        )
    }

    /// Also honor a flag that enables both overrides at once.
    pub fn with_combined(mut self, var: impl Into<String>) -> Self {
        self.combined_var = Some(var.into());
        self
    }
}

impl Default for EnvOverrides {
    fn default() -> Self {
        Self::new(DEFAULT_LOOPBACK_OVERRIDE_ENV, DEFAULT_PRIVATE_OVERRIDE_ENV)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| value == "true")
}

impl OverrideSource for EnvOverrides {
    fn current(&self) -> Overrides {
        let combined = self.combined_var.as_deref().is_some_and(env_flag);
        Overrides {
            allow_loopback: combined || env_flag(&self.loopback_var),
            allow_private_network: combined || env_flag(&self.private_network_var),
        }
    }
}

/// Per-category permissions plus an allowlist of exempt networks.
#[derive(Clone)]
pub struct EgressPolicy {
    pub allow_loopback: bool,
    pub allow_private_network: bool,
    pub allow_link_local: bool,
    allowlist: Vec<IpNet>,
    classifier: Arc<Classifier>,
    overrides: Arc<dyn OverrideSource>,
}

impl std::fmt::Debug for EgressPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EgressPolicy")
            .field("allow_loopback", &self.allow_loopback)
            .field("allow_private_network", &self.allow_private_network)
            .field("allow_link_local", &self.allow_link_local)
            .field("allowlist", &self.allowlist)
            .finish_non_exhaustive()
    }
}

impl Default for EgressPolicy {
    /// Blocks every non-public category; honors the default environment flags.
    fn default() -> Self {
        Self {
            allow_loopback: false,
            allow_private_network: false,
            allow_link_local: false,
            allowlist: Vec::new(),
            classifier: Arc::new(Classifier::default()),
            overrides: Arc::new(EnvOverrides::default()),
        }
    }
}

impl EgressPolicy {
    /// Strict policy with no runtime overrides at all.
    pub fn strict() -> Self {
        Self::default().with_overrides(NoOverrides)
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            allow_loopback: config.allow_loopback,
            allow_private_network: config.allow_private_network,
            allow_link_local: config.allow_link_local,
            allowlist: config.allowlist(),
            classifier: Arc::new(Classifier::default()),
            overrides: Arc::new(EnvOverrides::from_config(config)),
        }
    }

    pub fn with_overrides(mut self, overrides: impl OverrideSource + 'static) -> Self {
        self.overrides = Arc::new(overrides);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_allowlist(mut self, allowlist: Vec<IpNet>) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Check a single resolved address for `host`.
    pub fn check_ip(&self, host: &str, ip: IpAddr) -> Result<(), GuardError> {
        self.check_ip_with(host, ip, self.overrides.current())
    }

    /// Check every resolved address; any blocked address fails the whole set.
    ///
    /// Overrides are read once so all addresses see the same decision.
    pub fn check_all(&self, host: &str, ips: &[IpAddr]) -> Result<(), GuardError> {
        let overrides = self.overrides.current();
        ips.iter()
            .try_for_each(|ip| self.check_ip_with(host, *ip, overrides))
    }

    fn check_ip_with(&self, host: &str, ip: IpAddr, overrides: Overrides) -> Result<(), GuardError> {
        let classification = self.classifier.classify(ip);
        let category = classification.dial_category();

        let (configured, overridden) = match category {
            Category::Public => return Ok(()),
            Category::Loopback => (self.allow_loopback, overrides.allow_loopback),
            Category::LinkLocal => (self.allow_link_local, false),
            Category::PrivateNetwork => {
                (self.allow_private_network, overrides.allow_private_network)
            }
        };
        if configured {
            debug!(ip = %ip, host = %host, category = %category, "address permitted by policy");
            return Ok(());
        }
        if overridden {
            info!(ip = %ip, host = %host, category = %category, "address permitted by runtime override");
            return Ok(());
        }

        if self
            .allowlist
            .iter()
            .any(|net| net.contains(&ip) || net.contains(&classification.effective))
        {
            info!(ip = %ip, host = %host, "allowing allowlisted private address");
            return Ok(());
        }

        error!(
            ip = %ip,
            host = %host,
            category = %category,
            tag = ?classification.tag,
            "SSRF blocked: host resolved to disallowed address"
        );
        Err(GuardError::Blocked {
            host: host.to_string(),
            ip,
            category,
        })
    }
}
