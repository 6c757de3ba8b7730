// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reserved and special-use address blocks.
//!
//! A [`RangeTable`] is built once (usually via [`RangeTable::reserved`]) and
//! handed to the [`Classifier`](crate::classify::Classifier). It is never
//! mutated afterwards, so it can be shared across threads without locking.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// Semantic tag attached to a reserved address block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeTag {
    /// `0.0.0.0` or `::`.
    Unspecified,
    /// `127.0.0.0/8`, `::1`.
    Loopback,
    /// `169.254.0.0/16`, `fe80::/10`.
    LinkLocal,
    /// RFC 1918 and IPv6 unique-local space.
    PrivateNetwork,
    /// Carrier-grade NAT, `100.64.0.0/10`.
    SharedCgnat,
    /// TEST-NET blocks and `2001:db8::/32`.
    Documentation,
    /// `198.18.0.0/15`, `2001:2::/48`.
    Benchmarking,
    /// Multicast carrying an explicit scope value (the low nibble of the
    /// second IPv6 byte). IPv4 `224.0.0.0/24` is tagged with scope 2.
    MulticastScope(u8),
    /// IPv4 administratively scoped multicast, `239.0.0.0/8`.
    AdminMulticast,
    /// Reserved or otherwise non-routable space (`0.0.0.0/8`, class E, ...).
    Reserved,
    /// `255.255.255.255`.
    Broadcast,
}

/// Policy category derived from a [`RangeTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Loopback,
    LinkLocal,
    PrivateNetwork,
    Public,
}

impl RangeTag {
    /// Category used by the address predicates.
    ///
    /// Multicast is private only when administratively or organisationally
    /// scoped: interface-local (1), link-local (2) and global (E) scopes are
    /// public here.
    pub fn category(self) -> Category {
        match self {
            Self::Loopback => Category::Loopback,
            Self::LinkLocal => Category::LinkLocal,
            Self::MulticastScope(0x1 | 0x2 | 0xe) => Category::Public,
            _ => Category::PrivateNetwork,
        }
    }

    /// Category used when deciding whether to connect.
    ///
    /// Stricter than [`category`](Self::category): the unspecified address
    /// and interface-local multicast reach the local host, and link-local
    /// multicast never leaves the segment.
    pub fn dial_category(self) -> Category {
        match self {
            Self::Unspecified | Self::MulticastScope(0x1) => Category::Loopback,
            Self::MulticastScope(0x2) => Category::LinkLocal,
            _ => self.category(),
        }
    }

    /// Whether an address carrying this tag is private to the predicates.
    pub fn is_private(self) -> bool {
        self.category() != Category::Public
    }
}

impl fmt::Display for RangeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("unspecified"),
            Self::Loopback => f.write_str("loopback"),
            Self::LinkLocal => f.write_str("link-local"),
            Self::PrivateNetwork => f.write_str("private-network"),
            Self::SharedCgnat => f.write_str("shared-cgnat"),
            Self::Documentation => f.write_str("documentation"),
            Self::Benchmarking => f.write_str("benchmarking"),
            Self::MulticastScope(scope) => write!(f, "multicast-scope-{scope:X}"),
            Self::AdminMulticast => f.write_str("admin-multicast"),
            Self::Reserved => f.write_str("reserved"),
            Self::Broadcast => f.write_str("broadcast"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loopback => "loopback",
            Self::LinkLocal => "link-local",
            Self::PrivateNetwork => "private",
            Self::Public => "public",
        })
    }
}

/// An immutable (network, tag) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub net: IpNet,
    pub tag: RangeTag,
}

impl AddressRange {
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.net.contains(ip)
    }
}

// More specific blocks come first: lookup returns the first match.
const IPV4_RESERVED: &[(Ipv4Addr, u8, RangeTag)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 32, RangeTag::Unspecified),
    (Ipv4Addr::new(0, 0, 0, 0), 8, RangeTag::Reserved),
    (Ipv4Addr::new(10, 0, 0, 0), 8, RangeTag::PrivateNetwork),
    (Ipv4Addr::new(100, 64, 0, 0), 10, RangeTag::SharedCgnat),
    (Ipv4Addr::new(127, 0, 0, 0), 8, RangeTag::Loopback),
    (Ipv4Addr::new(169, 254, 0, 0), 16, RangeTag::LinkLocal),
    (Ipv4Addr::new(172, 16, 0, 0), 12, RangeTag::PrivateNetwork),
    (Ipv4Addr::new(192, 0, 0, 0), 24, RangeTag::Reserved),
    (Ipv4Addr::new(192, 0, 2, 0), 24, RangeTag::Documentation),
    (Ipv4Addr::new(192, 168, 0, 0), 16, RangeTag::PrivateNetwork),
    (Ipv4Addr::new(198, 18, 0, 0), 15, RangeTag::Benchmarking),
    (Ipv4Addr::new(198, 51, 100, 0), 24, RangeTag::Documentation),
    (Ipv4Addr::new(203, 0, 113, 0), 24, RangeTag::Documentation),
    (Ipv4Addr::new(224, 0, 0, 0), 24, RangeTag::MulticastScope(0x2)),
    (Ipv4Addr::new(239, 0, 0, 0), 8, RangeTag::AdminMulticast),
    (Ipv4Addr::new(255, 255, 255, 255), 32, RangeTag::Broadcast),
    (Ipv4Addr::new(240, 0, 0, 0), 4, RangeTag::Reserved),
];

// Multicast (ff00::/8) is classified by scope, not by table lookup.
const IPV6_RESERVED: &[(Ipv6Addr, u8, RangeTag)] = &[
    (Ipv6Addr::UNSPECIFIED, 128, RangeTag::Unspecified),
    (Ipv6Addr::LOCALHOST, 128, RangeTag::Loopback),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10, RangeTag::LinkLocal),
    (Ipv6Addr::new(0xfec0, 0, 0, 0, 0, 0, 0, 0), 10, RangeTag::Reserved),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7, RangeTag::PrivateNetwork),
    (Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 0), 32, RangeTag::Documentation),
    (Ipv6Addr::new(0x2001, 0x0002, 0, 0, 0, 0, 0, 0), 48, RangeTag::Benchmarking),
    (Ipv6Addr::new(0x0100, 0, 0, 0, 0, 0, 0, 0), 64, RangeTag::Reserved),
];

/// Ordered set of reserved address blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTable {
    ranges: Vec<AddressRange>,
}

impl RangeTable {
    /// Build a table from explicit ranges. Earlier ranges win on overlap.
    pub fn new(ranges: Vec<AddressRange>) -> Self {
        Self { ranges }
    }

    /// The standard table of IPv4 and IPv6 special-use blocks.
    pub fn reserved() -> Self {
        let v4 = IPV4_RESERVED.iter().filter_map(|&(addr, len, tag)| {
            Ipv4Net::new(addr, len).ok().map(|net| AddressRange {
                net: IpNet::V4(net),
                tag,
            })
        });
        let v6 = IPV6_RESERVED.iter().filter_map(|&(addr, len, tag)| {
            Ipv6Net::new(addr, len).ok().map(|net| AddressRange {
                net: IpNet::V6(net),
                tag,
            })
        });
        Self::new(v4.chain(v6).collect())
    }

    /// Tag of the first range containing `ip`.
    pub fn lookup(&self, ip: &IpAddr) -> Option<RangeTag> {
        self.ranges
            .iter()
            .find(|range| range.contains(ip))
            .map(|range| range.tag)
    }

    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::reserved()
    }
}
