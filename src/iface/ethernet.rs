//! Ethernet II framing
//!
//! Just enough of the link layer to carry IPv4 datagrams over a TAP device:
//! MAC addresses, EtherType values and the 14-byte header.

use std::fmt;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

pub const ETHERNET_HEADER_LEN: usize = 14;

/// EtherType constants
pub mod ether_type {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const IPV6: u16 = 0x86DD;
}

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    /// Parse "aa:bb:cc:dd:ee:ff"
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(Error::InvalidMacAddress(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(Error::InvalidMacAddress(s.to_string()));
            }
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| Error::InvalidMacAddress(s.to_string()))?;
        }

        Ok(MacAddr(octets))
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Ethernet II header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ether_type: u16,
}

impl EthernetHeader {
    /// Split a frame into its header and payload
    pub fn parse(frame: &[u8]) -> Result<(Self, &[u8])> {
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err(Error::TruncatedFrame(frame.len()));
        }

        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&frame[0..6]);
        src.copy_from_slice(&frame[6..12]);

        let header = EthernetHeader {
            dst: MacAddr(dst),
            src: MacAddr(src),
            ether_type: BigEndian::read_u16(&frame[12..14]),
        };

        Ok((header, &frame[ETHERNET_HEADER_LEN..]))
    }

    pub fn to_bytes(&self) -> [u8; ETHERNET_HEADER_LEN] {
        let mut bytes = [0u8; ETHERNET_HEADER_LEN];
        bytes[0..6].copy_from_slice(&self.dst.0);
        bytes[6..12].copy_from_slice(&self.src.0);
        BigEndian::write_u16(&mut bytes[12..14], self.ether_type);
        bytes
    }

    /// Build a complete frame around `payload`
    pub fn frame(&self, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(ETHERNET_HEADER_LEN + payload.len());
        frame.extend_from_slice(&self.to_bytes());
        frame.extend_from_slice(payload);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_parse_and_format() {
        let mac: MacAddr = "02:42:ac:11:00:02".parse().unwrap();
        assert_eq!(mac.0, [0x02, 0x42, 0xAC, 0x11, 0x00, 0x02]);
        assert_eq!(mac.to_string(), "02:42:ac:11:00:02");
        assert!(MacAddr::parse("ff:ff:ff:ff:ff:ff\n").unwrap().is_broadcast());
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!(MacAddr::parse("02:42:ac:11:00").is_err());
        assert!(MacAddr::parse("02:42:ac:11:00:zz").is_err());
        assert!(MacAddr::parse("02:42:ac:11:00:123").is_err());
    }

    #[test]
    fn test_header_round_trip() {
        let header = EthernetHeader {
            dst: MacAddr::BROADCAST,
            src: MacAddr([2, 0, 0, 0, 0, 1]),
            ether_type: ether_type::IPV4,
        };
        let frame = header.frame(&[0x45, 0x00]);
        assert_eq!(&frame[12..14], &[0x08, 0x00]);

        let (parsed, payload) = EthernetHeader::parse(&frame).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(payload, &[0x45, 0x00]);
    }

    #[test]
    fn test_parse_truncated_frame() {
        assert!(matches!(
            EthernetHeader::parse(&[0u8; 13]),
            Err(Error::TruncatedFrame(13))
        ));
    }
}
