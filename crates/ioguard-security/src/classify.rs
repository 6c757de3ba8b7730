// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address classification.
//!
//! IPv4 goes through a byte-comparison fast path; IPv6 goes through the
//! [`RangeTable`] plus the multicast scope rule. IPv4 payloads embedded in
//! IPv6 (mapped, compatible, NAT64 well-known prefix) are unwrapped first,
//! so every predicate sees the same effective address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use crate::ranges::{Category, RangeTable, RangeTag};

/// `64:ff9b::/96` (RFC 6052).
const NAT64_WELL_KNOWN_PREFIX: [u8; 12] = [0x00, 0x64, 0xff, 0x9b, 0, 0, 0, 0, 0, 0, 0, 0];

static DEFAULT_CLASSIFIER: LazyLock<Classifier> = LazyLock::new(Classifier::default);

/// Whether the address should be blocked by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Private,
    Public,
}

/// Result of classifying one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Address as supplied by the caller.
    pub addr: IpAddr,
    /// Address the tag was computed for (the IPv4 payload for embedded forms).
    pub effective: IpAddr,
    /// Matching reserved block, if any.
    pub tag: Option<RangeTag>,
}

impl Classification {
    pub fn category(&self) -> Category {
        self.tag.map_or(Category::Public, RangeTag::category)
    }

    pub fn disposition(&self) -> Disposition {
        if self.is_private() {
            Disposition::Private
        } else {
            Disposition::Public
        }
    }

    /// Category the connection policy applies; see [`RangeTag::dial_category`].
    pub fn dial_category(&self) -> Category {
        self.tag.map_or(Category::Public, RangeTag::dial_category)
    }

    pub fn is_private(&self) -> bool {
        self.category() != Category::Public
    }
}

/// Classifies addresses against an explicit, immutable [`RangeTable`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: RangeTable,
}

impl Classifier {
    pub fn new(table: RangeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RangeTable {
        &self.table
    }

    /// Classify an address using the IPv4 fast path where possible.
    pub fn classify(&self, addr: IpAddr) -> Classification {
        let effective = effective_addr(addr);
        let tag = match effective {
            IpAddr::V4(v4) => classify_v4_fast(v4),
            IpAddr::V6(v6) => self.classify_v6(v6),
        };
        Classification {
            addr,
            effective,
            tag,
        }
    }

    /// Classify an address using only the table and the multicast rule.
    ///
    /// Agrees with [`classify`](Self::classify) when built from
    /// [`RangeTable::reserved`].
    pub fn classify_with_table(&self, addr: IpAddr) -> Classification {
        let effective = effective_addr(addr);
        let tag = match effective {
            IpAddr::V4(_) => self.table.lookup(&effective),
            IpAddr::V6(v6) => self.classify_v6(v6),
        };
        Classification {
            addr,
            effective,
            tag,
        }
    }

    fn classify_v6(&self, v6: Ipv6Addr) -> Option<RangeTag> {
        let octets = v6.octets();
        if octets[0] == 0xff {
            return Some(RangeTag::MulticastScope(octets[1] & 0x0f));
        }
        self.table.lookup(&IpAddr::V6(v6))
    }

    pub fn is_loopback(&self, addr: IpAddr) -> bool {
        self.classify(addr).category() == Category::Loopback
    }

    pub fn is_link_local(&self, addr: IpAddr) -> bool {
        self.classify(addr).category() == Category::LinkLocal
    }

    pub fn is_private_network(&self, addr: IpAddr) -> bool {
        self.classify(addr).category() == Category::PrivateNetwork
    }

    /// Loopback, link-local or private-network.
    pub fn is_private(&self, addr: IpAddr) -> bool {
        self.classify(addr).is_private()
    }
}

/// IPv4 address embedded in an IPv6 address, if any.
///
/// Recognizes IPv4-mapped (`::ffff:a.b.c.d`), IPv4-compatible
/// (`::a.b.c.d`) and NAT64 (`64:ff9b::a.b.c.d`) forms. `::` and `::1` are
/// IPv6 addresses in their own right and are not unwrapped.
pub fn embedded_ipv4(v6: &Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return Some(v4);
    }
    let octets = v6.octets();
    let payload = Ipv4Addr::new(octets[12], octets[13], octets[14], octets[15]);
    if octets[..12] == [0; 12] {
        if octets[12..15] == [0, 0, 0] && octets[15] <= 1 {
            return None;
        }
        return Some(payload);
    }
    if octets[..12] == NAT64_WELL_KNOWN_PREFIX {
        return Some(payload);
    }
    None
}

fn effective_addr(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => embedded_ipv4(&v6).map_or(addr, IpAddr::V4),
        IpAddr::V4(_) => addr,
    }
}

/// Byte-comparison classification of an IPv4 address.
pub fn classify_v4_fast(ip: Ipv4Addr) -> Option<RangeTag> {
    let [a, b, c, d] = ip.octets();
    match a {
        0 if b == 0 && c == 0 && d == 0 => Some(RangeTag::Unspecified),
        0 => Some(RangeTag::Reserved),
        10 => Some(RangeTag::PrivateNetwork),
        100 if b & 0xc0 == 64 => Some(RangeTag::SharedCgnat),
        127 => Some(RangeTag::Loopback),
        169 if b == 254 => Some(RangeTag::LinkLocal),
        172 if b & 0xf0 == 16 => Some(RangeTag::PrivateNetwork),
        192 => match (b, c) {
            (0, 0) => Some(RangeTag::Reserved),
            (0, 2) => Some(RangeTag::Documentation),
            (168, _) => Some(RangeTag::PrivateNetwork),
            _ => None,
        },
        198 => match (b, c) {
            (18 | 19, _) => Some(RangeTag::Benchmarking),
            (51, 100) => Some(RangeTag::Documentation),
            _ => None,
        },
        203 if b == 0 && c == 113 => Some(RangeTag::Documentation),
        224 if b == 0 && c == 0 => Some(RangeTag::MulticastScope(0x2)),
        239 => Some(RangeTag::AdminMulticast),
        255 if b == 255 && c == 255 && d == 255 => Some(RangeTag::Broadcast),
        240..=255 => Some(RangeTag::Reserved),
        _ => None,
    }
}

/// [`Classifier::is_private`] against the standard reserved table.
pub fn is_private_ip(addr: IpAddr) -> bool {
    DEFAULT_CLASSIFIER.is_private(addr)
}

/// [`Classifier::is_loopback`] against the standard reserved table.
pub fn is_loopback_ip(addr: IpAddr) -> bool {
    DEFAULT_CLASSIFIER.is_loopback(addr)
}

/// [`Classifier::is_link_local`] against the standard reserved table.
pub fn is_link_local_ip(addr: IpAddr) -> bool {
    DEFAULT_CLASSIFIER.is_link_local(addr)
}

/// [`Classifier::is_private_network`] against the standard reserved table.
pub fn is_private_network_ip(addr: IpAddr) -> bool {
    DEFAULT_CLASSIFIER.is_private_network(addr)
}
