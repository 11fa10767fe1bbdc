//! IPv4 address type
//!
//! A plain 4-byte address in network order with dotted-quad parsing and
//! formatting.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// IPv4 address stored as its four wire octets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Ipv4Address(pub [u8; 4]);

impl Ipv4Address {
    pub const UNSPECIFIED: Ipv4Address = Ipv4Address([0, 0, 0, 0]);
    pub const BROADCAST: Ipv4Address = Ipv4Address([255, 255, 255, 255]);

    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Ipv4Address([a, b, c, d])
    }

    /// Parse an address from the format "a.b.c.d"
    ///
    /// Each component must be a decimal integer that fits in an `i64`. Values
    /// outside 0..=255, negative ones included, are truncated to their low 8
    /// bits, the same as a byte cast.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(Error::MalformedAddress(s.to_string()));
        }

        let mut octets = [0u8; 4];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            let value: i64 = part
                .parse()
                .map_err(|_| Error::MalformedAddress(s.to_string()))?;
            *octet = value as u8;
        }

        Ok(Ipv4Address(octets))
    }

    /// Build an address from a slice that must be exactly 4 bytes long
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let octets: [u8; 4] = data.try_into().map_err(|_| Error::WrongLength(data.len()))?;
        Ok(Ipv4Address(octets))
    }

    pub fn octets(&self) -> [u8; 4] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

impl FromStr for Ipv4Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&[u8]> for Ipv4Address {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data)
    }
}

impl From<[u8; 4]> for Ipv4Address {
    fn from(octets: [u8; 4]) -> Self {
        Ipv4Address(octets)
    }
}

impl From<std::net::Ipv4Addr> for Ipv4Address {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Ipv4Address(addr.octets())
    }
}

impl From<Ipv4Address> for std::net::Ipv4Addr {
    fn from(addr: Ipv4Address) -> Self {
        std::net::Ipv4Addr::from(addr.0)
    }
}
