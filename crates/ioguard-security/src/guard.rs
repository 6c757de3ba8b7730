// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection guard: resolve, check every address, then dial.
//!
//! DNS resolution and dialing are both behind traits so tests (and callers
//! with their own transports) can substitute them. Every step honors the
//! caller's [`CallContext`]: cancellation and deadline are checked before
//! resolution and raced against each network operation.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ioguard_config::SecurityConfig;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GuardError;
use crate::extract::HostPort;
use crate::policy::{EgressPolicy, EnvOverrides, DANGEROUS_ALLOW_LOCAL_IPS_ENV};

/// Default connect timeout used by [`check_connection`].
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Cancellation token and optional deadline for one guarded operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail fast if the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), GuardError> {
        if self.cancel.is_cancelled() {
            return Err(GuardError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(GuardError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the token fires or the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, GuardError> {
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(GuardError::Cancelled),
            _ = expiry => Err(GuardError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

/// Address family selected by the network name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Any,
    V4,
    V6,
}

impl AddressFamily {
    /// `tcp`/`udp` select any family; a `4` or `6` suffix restricts it.
    pub fn from_network(network: &str) -> Result<Self, GuardError> {
        match network {
            "tcp" | "udp" => Ok(Self::Any),
            "tcp4" | "udp4" => Ok(Self::V4),
            "tcp6" | "udp6" => Ok(Self::V6),
            _ => Err(GuardError::InvalidAddress {
                address: network.to_string(),
                reason: "unsupported network",
            }),
        }
    }

    pub fn admits(self, ip: &IpAddr) -> bool {
        match self {
            Self::Any => true,
            Self::V4 => ip.is_ipv4(),
            Self::V6 => ip.is_ipv6(),
        }
    }
}

/// Hostname to IP address resolution.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup_ip(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup_ip(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Opens a connection to one literal socket address.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Conn: Send;

    async fn dial(&self, addr: SocketAddr) -> io::Result<Self::Conn>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Conn = TcpStream;

    async fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}

/// Dialer that refuses to connect to addresses blocked by its [`EgressPolicy`].
///
/// All resolved addresses are checked before any dial attempt: if one of
/// them is blocked, nothing is dialed. Allowed addresses are then tried in
/// resolver order and the first successful connection is returned.
pub struct SafeDialer<D = TcpDialer> {
    policy: EgressPolicy,
    resolver: Arc<dyn Resolver>,
    dialer: D,
    timeout: Option<Duration>,
}

impl SafeDialer<TcpDialer> {
    /// Strict dialer: every non-public category blocked, environment
    /// overrides honored, system DNS, plain TCP.
    pub fn new() -> Self {
        Self {
            policy: EgressPolicy::default(),
            resolver: Arc::new(SystemResolver),
            dialer: TcpDialer,
            timeout: None,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new()
            .with_policy(EgressPolicy::from_config(config))
            .with_timeout(Duration::from_secs(config.dial_timeout_secs))
    }
}

impl Default for SafeDialer<TcpDialer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dialer> SafeDialer<D> {
    pub fn with_policy(mut self, policy: EgressPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_dialer<D2: Dialer>(self, dialer: D2) -> SafeDialer<D2> {
        SafeDialer {
            policy: self.policy,
            resolver: self.resolver,
            dialer,
            timeout: self.timeout,
        }
    }

    /// Per-attempt connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> &EgressPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut EgressPolicy {
        &mut self.policy
    }

    /// Resolve `host` and check every address without dialing.
    pub async fn check_host(&self, ctx: &CallContext, host: &str) -> Result<Vec<IpAddr>, GuardError> {
        self.resolve_checked(ctx, host, AddressFamily::Any).await
    }

    /// Resolve `host` (or parse it as a literal), filter by family and
    /// check every address against the policy.
    pub async fn resolve_checked(
        &self,
        ctx: &CallContext,
        host: &str,
        family: AddressFamily,
    ) -> Result<Vec<IpAddr>, GuardError> {
        ctx.check()?;

        let ips = match host.parse::<IpAddr>() {
            Ok(ip) => vec![ip],
            Err(_) => {
                debug!(host = %host, "resolving host");
                ctx.run(self.resolver.lookup_ip(host))
                    .await?
                    .map_err(|source| GuardError::Resolve {
                        host: host.to_string(),
                        source,
                    })?
            }
        };

        let ips: Vec<IpAddr> = ips.into_iter().filter(|ip| family.admits(ip)).collect();
        if ips.is_empty() {
            return Err(GuardError::NoAddresses {
                host: host.to_string(),
            });
        }

        self.policy.check_all(host, &ips)?;
        Ok(ips)
    }

    /// Dial `addr` (`host:port`) over `network` once every resolved
    /// address has passed the policy.
    pub async fn dial_context(
        &self,
        ctx: &CallContext,
        network: &str,
        addr: &str,
    ) -> Result<D::Conn, GuardError> {
        let family = AddressFamily::from_network(network)?;
        let (host, port) = split_target(addr)?;
        let ips = self.resolve_checked(ctx, host, family).await?;

        let mut first_err = None;
        for ip in ips {
            let target = SocketAddr::new(ip, port);
            match self.dial_one(ctx, target).await {
                Ok(conn) => {
                    debug!(host = %host, addr = %target, "guarded dial connected");
                    return Ok(conn);
                }
                Err(err) if err.is_cancellation() => return Err(err),
                Err(err) => {
                    warn!(host = %host, addr = %target, error = %err, "guarded dial attempt failed");
                    first_err.get_or_insert(err);
                }
            }
        }

        Err(first_err.unwrap_or_else(|| GuardError::NoAddresses {
            host: host.to_string(),
        }))
    }

    async fn dial_one(&self, ctx: &CallContext, addr: SocketAddr) -> Result<D::Conn, GuardError> {
        let attempt = self.dialer.dial(addr);
        let result = match self.timeout {
            Some(timeout) => ctx
                .run(tokio::time::timeout(timeout, attempt))
                .await?
                .unwrap_or_else(|_elapsed| {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))
                }),
            None => ctx.run(attempt).await?,
        };
        result.map_err(|source| GuardError::Dial { addr, source })
    }
}

fn split_target(addr: &str) -> Result<(&str, u16), GuardError> {
    let invalid = |reason| GuardError::InvalidAddress {
        address: addr.to_string(),
        reason,
    };
    let parts = HostPort::parse(addr).ok_or_else(|| invalid("malformed host/port"))?;
    let port = parts.port.ok_or_else(|| invalid("missing port"))?;
    let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
    let host = parts.host_without_zone();
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok((host, port))
}

/// Dial through a strict [`SafeDialer`] with default settings.
pub async fn safe_dial_context(
    ctx: &CallContext,
    network: &str,
    addr: &str,
) -> Result<TcpStream, GuardError> {
    SafeDialer::new().dial_context(ctx, network, addr).await
}

/// Turn a URL or `host[:port]` string into a dialable `host:port`.
///
/// URLs default to port 443 for `https` and 80 otherwise; bare hosts
/// default to 80.
pub fn connection_target(address: &str) -> Result<String, GuardError> {
    let invalid = |reason| GuardError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    if address.contains("://") {
        let url = url::Url::parse(address).map_err(|_| invalid("invalid url"))?;
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let port = url
            .port()
            .unwrap_or(if url.scheme() == "https" { 443 } else { 80 });
        return Ok(format!("{host}:{port}"));
    }

    let parts = HostPort::parse(address).ok_or_else(|| invalid("malformed host/port"))?;
    if parts.host.is_empty() {
        return Err(invalid("missing host"));
    }
    let port = parts.port.unwrap_or("80");
    if parts.host.contains(':') {
        Ok(format!("[{}]:{port}", parts.host))
    } else {
        Ok(format!("{}:{port}", parts.host))
    }
}

/// Verify that `address` is reachable without touching a blocked network.
///
/// Uses a strict dialer that honors the loopback, private-network and
/// [`DANGEROUS_ALLOW_LOCAL_IPS_ENV`] environment flags, with a
/// [`DEFAULT_DIAL_TIMEOUT`] connect timeout. The connection is closed
/// immediately.
pub async fn check_connection(ctx: &CallContext, address: &str) -> Result<(), GuardError> {
    let target = connection_target(address)?;
    let policy = EgressPolicy::default()
        .with_overrides(EnvOverrides::default().with_combined(DANGEROUS_ALLOW_LOCAL_IPS_ENV));
    let dialer = SafeDialer::new()
        .with_policy(policy)
        .with_timeout(DEFAULT_DIAL_TIMEOUT);
    let _conn = dialer.dial_context(ctx, "tcp", &target).await?;
    Ok(())
}
