// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host extraction from `host`, `host:port`, `[v6]` and `[v6]:port` strings.
//!
//! Input is never trimmed: surrounding whitespace makes it invalid.

use std::net::IpAddr;

/// A split `host[:port]` string. The host has brackets removed but keeps
/// any `%zone` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPort<'a> {
    pub host: &'a str,
    pub port: Option<&'a str>,
}

impl<'a> HostPort<'a> {
    /// Split `input` into host and optional port.
    ///
    /// A single colon separates a port; two or more colons without
    /// brackets are read as a bare IPv6 literal. Returns `None` for
    /// unbalanced or misplaced brackets.
    pub fn parse(input: &'a str) -> Option<Self> {
        if let Some(rest) = input.strip_prefix('[') {
            let close = rest.find(']')?;
            let host = &rest[..close];
            let tail = &rest[close + 1..];
            if host.contains('[') {
                return None;
            }
            let port = match tail {
                "" => None,
                _ => {
                    let port = tail.strip_prefix(':')?;
                    if port.contains([':', '[', ']']) {
                        return None;
                    }
                    Some(port)
                }
            };
            return Some(Self { host, port });
        }

        if input.contains(['[', ']']) {
            return None;
        }

        match input.split_once(':') {
            Some((host, port)) if !port.contains(':') => Some(Self {
                host,
                port: Some(port),
            }),
            _ => Some(Self {
                host: input,
                port: None,
            }),
        }
    }

    /// Host with any `%zone` suffix removed.
    pub fn host_without_zone(&self) -> &'a str {
        strip_zone(self.host)
    }

    /// Port parsed as a number.
    pub fn port_number(&self) -> Option<u16> {
        self.port.and_then(|p| p.parse().ok())
    }
}

fn strip_zone(host: &str) -> &str {
    host.split_once('%').map_or(host, |(addr, _zone)| addr)
}

/// Extract a literal IP address from `input`.
///
/// Accepts `ip`, `ip:port`, `[v6]`, `[v6]:port` and bare IPv6; strips a
/// `%zone` suffix. Returns `None` for anything else, including hostnames.
pub fn extract_ip(input: &str) -> Option<IpAddr> {
    let parts = HostPort::parse(input)?;
    parts.host_without_zone().parse().ok()
}

/// Extract the host portion of `input` without validating it as an IP.
///
/// Falls back to the input unchanged when it cannot be split.
pub fn extract_host(input: &str) -> &str {
    HostPort::parse(input).map_or(input, |parts| parts.host_without_zone())
}
