// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guarded outbound HTTP client.

use std::sync::Arc;
use std::time::Duration;

use ioguard_config::SecurityConfig;
use ioguard_core::IoGuardError;
use tracing::error;

use crate::policy::EgressPolicy;
use crate::ssrf::{validate_url_host, SsrfSafeResolver};

/// Request timeout applied to clients built by [`build_safe_client`].
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a reqwest::Client with egress checks.
///
/// - Minimum TLS 1.2 for all connections.
/// - DNS answers are checked by [`SsrfSafeResolver`] using the configured policy.
/// - Literal-IP URLs skip DNS; check them with [`SafeClient::validate`].
pub fn build_safe_client(config: &SecurityConfig) -> Result<reqwest::Client, IoGuardError> {
    build_client_with_policy(EgressPolicy::from_config(config))
}

fn build_client_with_policy(policy: EgressPolicy) -> Result<reqwest::Client, IoGuardError> {
    reqwest::Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .timeout(CLIENT_TIMEOUT)
        .dns_resolver(Arc::new(SsrfSafeResolver::new(policy)))
        .build()
        .map_err(|e| {
            error!("failed to build guarded HTTP client: {e}");
            IoGuardError::Security(format!("failed to build guarded HTTP client: {e}"))
        })
}

/// A guarded client paired with the policy used for literal-IP URLs.
#[derive(Debug, Clone)]
pub struct SafeClient {
    client: reqwest::Client,
    policy: EgressPolicy,
}

impl SafeClient {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, IoGuardError> {
        let policy = EgressPolicy::from_config(config);
        Ok(Self {
            client: build_client_with_policy(policy.clone())?,
            policy,
        })
    }

    /// Reject URLs whose literal host is blocked.
    pub fn validate(&self, url: &str) -> Result<(), IoGuardError> {
        validate_url_host(url, &self.policy)
    }

    /// Validate `url` and start a GET request.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, IoGuardError> {
        self.validate(url)?;
        Ok(self.client.get(url))
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}
