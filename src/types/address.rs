//! IPv4 address type backed by its 32-bit integer form.
//!
//! Sweeping walks the address space one integer at a time, so the address is
//! stored as a `u32` and only converted to dotted-quad text at the edges.
//! `0.0.0.0` and `255.255.255.255` are sentinels that mark the end of the
//! space; they are representable but never handed out as scan targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// An IPv4 address in host-order integer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(u32);

impl Address {
    /// The all-zero network sentinel.
    pub const ZERO: Address = Address(0);
    /// The all-ones broadcast sentinel.
    pub const BROADCAST: Address = Address(u32::MAX);

    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this is one of the two reserved boundary addresses.
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::ZERO.0 || self.0 == Self::BROADCAST.0
    }

    /// The neighbouring address in `direction`, or `None` past either end of
    /// the 32-bit space. Sentinel results are not filtered here.
    pub fn step(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::Forward => self.0.checked_add(1),
            Direction::Backward => self.0.checked_sub(1),
        }
        .map(Self)
    }

    pub fn to_ipv4(self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Self(u32::from(ip))
    }
}

impl From<Address> for Ipv4Addr {
    fn from(addr: Address) -> Self {
        addr.to_ipv4()
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        IpAddr::V4(addr.to_ipv4())
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ipv4())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => Ok(Self::from(ip)),
            Ok(IpAddr::V6(_)) => Err(AddressError::NotIpv4(s.to_string())),
            Err(_) => Err(AddressError::InvalidFormat(s.to_string())),
        }
    }
}

/// Error type for address parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid IPv4 address: {0}")]
    InvalidFormat(String),
    #[error("only IPv4 start addresses can be swept: {0}")]
    NotIpv4(String),
}

/// Which way the sweep walks through the address space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Increasing addresses (the default).
    #[default]
    Forward,
    /// Decreasing addresses.
    Backward,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let addr: Address = "10.0.0.1".parse().unwrap();
        assert_eq!(addr.as_u32(), 0x0A00_0001);
        assert_eq!(addr.to_string(), "10.0.0.1");
    }

    #[test]
    fn test_parse_rejects_non_ipv4() {
        assert!(matches!(
            "::1".parse::<Address>(),
            Err(AddressError::NotIpv4(_))
        ));
        assert!(matches!(
            "10.0.0".parse::<Address>(),
            Err(AddressError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_sentinels() {
        assert!(Address::ZERO.is_sentinel());
        assert!(Address::BROADCAST.is_sentinel());
        assert!(!"0.0.0.1".parse::<Address>().unwrap().is_sentinel());
        assert_eq!(Address::BROADCAST.to_string(), "255.255.255.255");
    }

    #[test]
    fn test_step_crosses_octets() {
        let addr: Address = "10.0.0.255".parse().unwrap();
        assert_eq!(addr.step(Direction::Forward).unwrap().to_string(), "10.0.1.0");

        let addr: Address = "10.1.0.0".parse().unwrap();
        assert_eq!(
            addr.step(Direction::Backward).unwrap().to_string(),
            "10.0.255.255"
        );
    }

    #[test]
    fn test_step_leaves_space() {
        assert!(Address::BROADCAST.step(Direction::Forward).is_none());
        assert!(Address::ZERO.step(Direction::Backward).is_none());
    }

    #[test]
    fn test_serde_as_text() {
        let addr: Address = "192.0.2.7".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"192.0.2.7\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
