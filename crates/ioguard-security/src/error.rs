// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors raised by the connection guard.

use std::io;
use std::net::{IpAddr, SocketAddr};

use ioguard_core::IoGuardError;
use thiserror::Error;

use crate::ranges::Category;

#[derive(Debug, Error)]
pub enum GuardError {
    /// The target could not be split into host and port, or used an
    /// unsupported network.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    /// A resolved address falls in a blocked category.
    #[error("ssrf attempt blocked: host {host} resolved to {category} ip {ip}")]
    Blocked {
        host: String,
        ip: IpAddr,
        category: Category,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("dns lookup failed for {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("no ip addresses found for host: {host}")]
    NoAddresses { host: String },

    #[error("failed to connect to {addr}: {source}")]
    Dial {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl GuardError {
    /// `true` for cancellation and deadline expiry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// `true` when a policy decision, rather than the network, failed the call.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

impl From<GuardError> for IoGuardError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::InvalidAddress { .. } | GuardError::Blocked { .. } => {
                IoGuardError::Security(err.to_string())
            }
            GuardError::Cancelled | GuardError::DeadlineExceeded => {
                IoGuardError::Interrupted(err.to_string())
            }
            GuardError::Resolve { host, source } => IoGuardError::Io {
                context: format!("resolve {host}"),
                source,
            },
            GuardError::NoAddresses { host } => IoGuardError::Io {
                context: format!("resolve {host}"),
                source: io::Error::new(io::ErrorKind::NotFound, "no ip addresses found"),
            },
            GuardError::Dial { addr, source } => IoGuardError::Io {
                context: format!("connect to {addr}"),
                source,
            },
        }
    }
}
