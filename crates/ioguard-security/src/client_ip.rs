// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client IP resolution for inbound HTTP requests.

use std::net::IpAddr;

use http::{Extensions, HeaderMap};
use ioguard_config::SecurityConfig;

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address attached to a request's [`Extensions`] once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteIp(pub IpAddr);

/// Resolve the client IP of a request.
///
/// With `trust_proxy`, `X-Real-IP` wins, then the first `X-Forwarded-For`
/// entry; header values that are not valid IPs are skipped. Otherwise only
/// the transport peer address is used.
pub fn client_ip(peer_addr: &str, headers: &HeaderMap, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        let real_ip = header_str(headers, X_REAL_IP)
            .map(str::trim)
            .and_then(crate::extract_ip);
        if real_ip.is_some() {
            return real_ip;
        }

        let forwarded = header_str(headers, X_FORWARDED_FOR)
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .and_then(crate::extract_ip);
        if forwarded.is_some() {
            return forwarded;
        }
    }
    crate::extract_ip(peer_addr)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Tag request extensions with the resolved client IP.
pub fn with_remote_ip(extensions: &mut Extensions, ip: IpAddr) {
    extensions.insert(RemoteIp(ip));
}

/// Client IP previously attached with [`with_remote_ip`].
pub fn remote_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions.get::<RemoteIp>().map(|remote| remote.0)
}

/// Client IP resolution bound to a configured proxy trust setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpResolver {
    trust_proxy: bool,
}

impl ClientIpResolver {
    pub fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.trust_proxy)
    }

    pub fn resolve(&self, peer_addr: &str, headers: &HeaderMap) -> Option<IpAddr> {
        client_ip(peer_addr, headers, self.trust_proxy)
    }

    /// Resolve and attach the client IP to `extensions`.
    pub fn tag(
        &self,
        peer_addr: &str,
        headers: &HeaderMap,
        extensions: &mut Extensions,
    ) -> Option<IpAddr> {
        let ip = self.resolve(peer_addr, headers)?;
        with_remote_ip(extensions, ip);
        Some(ip)
    }
}
