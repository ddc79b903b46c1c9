//! Networking utilities for cluster networks.
//!
//! This library provides helpers for:
//! - IPv4 CIDR parsing and containment checks
//! - Carving equal-sized subnets out of a VPC block
//! - Availability-zone count validation

use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

/// Networking errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Invalid IP address.
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// Invalid CIDR prefix.
    #[error("invalid CIDR prefix: {0}")]
    InvalidPrefix(String),

    /// Address pool exhausted.
    #[error("address pool exhausted: {0}")]
    PoolExhausted(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// ============================================================================
// CIDR blocks
// ============================================================================

/// Default VPC block.
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";

/// Longest prefix AWS accepts for a VPC or subnet.
pub const MAX_PREFIX_LEN: u8 = 28;

/// Shortest prefix AWS accepts for a VPC.
pub const MIN_VPC_PREFIX_LEN: u8 = 16;

/// IPv4 CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4Cidr {
    /// Base address of the block.
    pub address: Ipv4Addr,

    /// Prefix length (e.g., 16 for /16).
    pub prefix_len: u8,
}

impl Ipv4Cidr {
    /// Create a new block, masking the address to the prefix.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len > 32 {
            return Err(NetworkError::InvalidPrefix(format!(
                "prefix length {} exceeds 32",
                prefix_len
            )));
        }

        Ok(Self {
            address: mask_ipv4(address, prefix_len),
            prefix_len,
        })
    }

    /// Parse from CIDR notation (e.g., "10.0.0.0/16").
    pub fn from_cidr(s: &str) -> Result<Self, NetworkError> {
        let Some((addr_str, prefix_str)) = s.split_once('/') else {
            return Err(NetworkError::InvalidPrefix(format!(
                "missing '/' in CIDR: {}",
                s
            )));
        };

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidPrefix(prefix_str.to_string()))?;

        Self::new(address, prefix_len)
    }

    /// Check if an address is within this block.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        mask_ipv4(addr, self.prefix_len) == self.address
    }

    /// Check if another block lies entirely within this one.
    pub fn contains_block(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len && self.contains(other.address)
    }

    /// Number of addresses in this block.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cidr(s)
    }
}

impl serde::Serialize for Ipv4Cidr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_cidr(&s).map_err(serde::de::Error::custom)
    }
}

/// Check that `cidr` is acceptable as a VPC range (/16 to /28).
pub fn validate_vpc_block(cidr: &Ipv4Cidr) -> Result<(), NetworkError> {
    if !(MIN_VPC_PREFIX_LEN..=MAX_PREFIX_LEN).contains(&cidr.prefix_len) {
        return Err(NetworkError::InvalidPrefix(format!(
            "VPC range {} must be between /{} and /{}",
            cidr, MIN_VPC_PREFIX_LEN, MAX_PREFIX_LEN
        )));
    }
    Ok(())
}

/// Mask an IPv4 address to a prefix length.
fn mask_ipv4(addr: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
    let bits = u32::from(addr);
    let mask = if prefix_len == 0 {
        0
    } else if prefix_len >= 32 {
        u32::MAX
    } else {
        u32::MAX << (32 - prefix_len)
    };
    Ipv4Addr::from(bits & mask)
}

// ============================================================================
// Subnet planning
// ============================================================================

/// Sequential subnet allocator over a parent block.
#[derive(Debug)]
pub struct SubnetPlanner {
    /// Block to carve from.
    parent: Ipv4Cidr,

    /// Prefix length of every allocated subnet.
    prefix_len: u8,

    /// Index of the next subnet to allocate.
    next_index: u64,

    /// Number of subnets that fit (exclusive upper bound).
    capacity: u64,
}

impl SubnetPlanner {
    /// Create a planner that hands out `/prefix_len` subnets of `parent`.
    pub fn new(parent: Ipv4Cidr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len < parent.prefix_len {
            return Err(NetworkError::InvalidPrefix(format!(
                "subnet prefix /{} is shorter than parent {}",
                prefix_len, parent
            )));
        }
        if prefix_len > MAX_PREFIX_LEN {
            return Err(NetworkError::InvalidPrefix(format!(
                "subnet prefix /{} exceeds /{}",
                prefix_len, MAX_PREFIX_LEN
            )));
        }

        Ok(Self {
            parent,
            prefix_len,
            next_index: 0,
            capacity: 1u64 << (prefix_len - parent.prefix_len),
        })
    }

    /// Allocate the next subnet.
    pub fn allocate(&mut self) -> Result<Ipv4Cidr, NetworkError> {
        if self.next_index >= self.capacity {
            return Err(NetworkError::PoolExhausted(format!(
                "{} has no free /{} left",
                self.parent, self.prefix_len
            )));
        }

        let step = 1u64 << (32 - u32::from(self.prefix_len));
        let base = u64::from(u32::from(self.parent.address));
        let address = base + self.next_index * step;
        self.next_index += 1;

        // The address stays inside the parent block, which fits in 32 bits.
        Ipv4Cidr::new(Ipv4Addr::from(address as u32), self.prefix_len)
    }

    /// Get remaining subnets.
    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.next_index)
    }
}

/// Longest prefix that still fits `count` equal subnets in `parent`.
pub fn prefix_for_count(parent: &Ipv4Cidr, count: usize) -> Result<u8, NetworkError> {
    if count == 0 {
        return Err(NetworkError::Config("subnet count must be positive".into()));
    }
    let extra_bits = usize::BITS - (count - 1).leading_zeros();
    let prefix_len = u32::from(parent.prefix_len) + extra_bits;
    if prefix_len > u32::from(MAX_PREFIX_LEN) {
        return Err(NetworkError::PoolExhausted(format!(
            "{} cannot hold {} subnets",
            parent, count
        )));
    }
    Ok(prefix_len as u8)
}

/// Plan `count` subnets of `parent`, sized by `prefix_len` or, when absent,
/// as large as possible.
pub fn plan_subnets(
    parent: &Ipv4Cidr,
    count: usize,
    prefix_len: Option<u8>,
) -> Result<Vec<Ipv4Cidr>, NetworkError> {
    let prefix_len = match prefix_len {
        Some(p) => p,
        None => prefix_for_count(parent, count)?,
    };
    let mut planner = SubnetPlanner::new(*parent, prefix_len)?;
    if planner.remaining() < count as u64 {
        return Err(NetworkError::PoolExhausted(format!(
            "{} holds {} /{} subnets, {} requested",
            parent,
            planner.remaining(),
            prefix_len,
            count
        )));
    }
    (0..count).map(|_| planner.allocate()).collect()
}

// ============================================================================
// Availability zones
// ============================================================================

/// Default number of availability zones for an environment-agnostic stack.
pub const DEFAULT_MAX_AZS: u8 = 2;

/// Upper bound on availability zones a network may span.
pub const MAX_AZS: u8 = 6;

/// Validate an availability-zone count.
pub fn validate_max_azs(max_azs: u8) -> Result<u8, NetworkError> {
    if !(1..=MAX_AZS).contains(&max_azs) {
        return Err(NetworkError::Config(format!(
            "max_azs must be between 1 and {}, got {}",
            MAX_AZS, max_azs
        )));
    }
    Ok(max_azs)
}
