// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSRF-safe DNS resolver for reqwest.
//!
//! Implements `reqwest::dns::Resolve` so every hostname an HTTP client
//! connects to is checked against the [`EgressPolicy`] before a socket is
//! opened. Literal-IP URLs bypass DNS in reqwest, so they are checked
//! separately with [`validate_url_host`].

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use ioguard_core::IoGuardError;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::{debug, error};

use crate::guard::{Resolver, SystemResolver};
use crate::policy::EgressPolicy;

pub use crate::error::GuardError;

/// DNS resolver that fails when any resolved address is blocked.
#[derive(Clone)]
pub struct SsrfSafeResolver {
    policy: EgressPolicy,
    resolver: Arc<dyn Resolver>,
}

impl SsrfSafeResolver {
    pub fn new(policy: EgressPolicy) -> Self {
        Self {
            policy,
            resolver: Arc::new(SystemResolver),
        }
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Resolve and check `host`, returning socket addresses with port 0
    /// (reqwest fills in the real port).
    pub async fn resolve_checked(&self, host: &str) -> Result<Vec<SocketAddr>, GuardError> {
        let ips = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|source| GuardError::Resolve {
                host: host.to_string(),
                source,
            })?;
        if ips.is_empty() {
            return Err(GuardError::NoAddresses {
                host: host.to_string(),
            });
        }
        self.policy.check_all(host, &ips)?;
        debug!(host = %host, count = ips.len(), "resolved host passed egress policy");
        Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)).collect())
    }
}

impl Default for SsrfSafeResolver {
    fn default() -> Self {
        Self::new(EgressPolicy::default())
    }
}

impl Resolve for SsrfSafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let this = self.clone();
        let hostname = name.as_str().to_string();

        Box::pin(async move {
            let addrs = this
                .resolve_checked(&hostname)
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

/// Validate that a URL does not target a blocked literal IP.
///
/// Hostnames are not resolved here; they are checked by
/// [`SsrfSafeResolver`] at connect time.
pub fn validate_url_host(url: &str, policy: &EgressPolicy) -> Result<(), IoGuardError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| IoGuardError::Security(format!("invalid URL: {e}")))?;

    let ip = match parsed.host() {
        Some(url::Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(url::Host::Ipv6(v6)) => IpAddr::V6(v6),
        Some(url::Host::Domain(_)) | None => return Ok(()),
    };

    policy.check_ip(&ip.to_string(), ip).map_err(|e| {
        error!(ip = %ip, url = %crate::redact_dsn(url), "SSRF blocked: URL targets private IP");
        IoGuardError::from(e)
    })
}
