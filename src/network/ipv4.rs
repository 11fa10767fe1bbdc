//! IPv4 datagram implementation
//!
//! This module provides encoding and decoding of IPv4 datagrams as described
//! in RFC 791, including the variable-length options area.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Version|  IHL  |Type of Service|          Total Length         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Identification        |Flags|      Fragment Offset    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Time to Live |    Protocol   |         Header Checksum       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Source Address                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Destination Address                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Options                    |    Padding    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::network::addr::Ipv4Address;
use crate::network::checksum;
use crate::network::option::{decode_options_until, encode_options, Ipv4Option};

pub const IPV4_HEADER_LEN: usize = 20;
pub const MAX_OPTIONS_LEN: usize = 40;
pub const MAX_PACKET_LEN: usize = u16::MAX as usize;

const IPV4_VERSION: u8 = 4;
const DEFAULT_IHL: u8 = 5; // 5 * 4 = 20 bytes (standard header length)
const DEFAULT_TTL: u8 = 64;

/// Version and IHL packed in one byte
///
/// ```text
/// -0-1-2-3-4-5-6-7-
/// |Version|  IHL  |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionIhl(pub u8);

impl VersionIhl {
    pub const fn new(version: u8, ihl: u8) -> Self {
        VersionIhl((version << 4) | (ihl & 0x0F))
    }

    pub fn version(&self) -> u8 {
        self.0 >> 4
    }

    /// Header length in 32-bit words
    pub fn ihl(&self) -> u8 {
        self.0 & 0x0F
    }
}

/// Flags and fragment offset packed in two bytes
///
/// ```text
/// -0-1-2-3-4-5-6-7-8-9-10-11-12-13-14-15-
/// |Flags|        Fragment Offset        |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagsFragOffset(pub u16);

impl FlagsFragOffset {
    pub const fn new(flags: u16, fragment_offset: u16) -> Self {
        FlagsFragOffset((flags << 13) | (fragment_offset & flags::FRAGMENT_OFFSET_MASK))
    }

    pub fn flags(&self) -> u16 {
        self.0 >> 13
    }

    pub fn fragment_offset(&self) -> u16 {
        self.0 & flags::FRAGMENT_OFFSET_MASK
    }

    pub fn dont_fragment(&self) -> bool {
        self.0 & flags::DONT_FRAGMENT != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.0 & flags::MORE_FRAGMENTS != 0
    }
}

/// IPv4 datagram: header fields, options and opaque payload
///
/// The header length, total length and checksum are recomputed by
/// [`Ipv4Packet::encode`]; after [`Ipv4Packet::decode`] they hold the values
/// read from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Packet {
    ver_ihl: VersionIhl,
    pub tos: u8, // Type of Service
    pub total_len: u16,
    pub id: u16,
    pub flags_frag_offset: FlagsFragOffset,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_addr: Ipv4Address,
    pub dst_addr: Ipv4Address,
    pub options: Vec<Ipv4Option>,
    pub payload: Vec<u8>,
}

impl Ipv4Packet {
    /// Create an outbound packet with default header values
    ///
    /// Version 4, no options, TTL 64, protocol TCP and zero
    /// identification/flags/fragment offset.
    pub fn new(src_addr: Ipv4Address, dst_addr: Ipv4Address, payload: &[u8]) -> Self {
        Ipv4Packet {
            ver_ihl: VersionIhl::new(IPV4_VERSION, DEFAULT_IHL),
            tos: 0,
            total_len: (IPV4_HEADER_LEN + payload.len()).min(MAX_PACKET_LEN) as u16,
            id: 0,
            flags_frag_offset: FlagsFragOffset::default(),
            ttl: DEFAULT_TTL,
            protocol: protocol::TCP,
            checksum: 0,
            src_addr,
            dst_addr,
            options: Vec::new(),
            payload: payload.to_vec(),
        }
    }

    /// Append options to the packet
    pub fn with_options(mut self, options: impl IntoIterator<Item = Ipv4Option>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn version(&self) -> u8 {
        self.ver_ihl.version()
    }

    /// Header length in 32-bit words
    pub fn ihl(&self) -> u8 {
        self.ver_ihl.ihl()
    }

    /// Get the header length in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl() as usize) * 4
    }

    /// Payload length according to the total length field
    pub fn payload_len(&self) -> usize {
        (self.total_len as usize).saturating_sub(self.header_len())
    }

    /// Serialize the packet
    ///
    /// Options are padded to a 32-bit boundary, then IHL, total length and
    /// checksum are recomputed and stored back into `self`.
    pub fn encode(&mut self) -> Result<Vec<u8>> {
        let options = encode_options(&self.options);
        if options.len() > MAX_OPTIONS_LEN {
            return Err(Error::OptionsTooLong(options.len()));
        }

        let header_len = IPV4_HEADER_LEN + options.len();
        let total_len = header_len + self.payload.len();
        if total_len > MAX_PACKET_LEN {
            return Err(Error::PacketTooLarge(total_len));
        }

        self.ver_ihl = VersionIhl::new(IPV4_VERSION, (header_len / 4) as u8);
        self.total_len = total_len as u16;

        let mut buf = vec![0u8; total_len];
        buf[0] = self.ver_ihl.0;
        buf[1] = self.tos;
        BigEndian::write_u16(&mut buf[2..4], self.total_len);
        BigEndian::write_u16(&mut buf[4..6], self.id);
        BigEndian::write_u16(&mut buf[6..8], self.flags_frag_offset.0);
        buf[8] = self.ttl;
        buf[9] = self.protocol;
        // buf[10..12] stays 0 for checksum calculation
        buf[12..16].copy_from_slice(self.src_addr.as_bytes());
        buf[16..20].copy_from_slice(self.dst_addr.as_bytes());
        buf[IPV4_HEADER_LEN..header_len].copy_from_slice(&options);
        buf[header_len..].copy_from_slice(&self.payload);

        self.checksum = checksum(&buf[..header_len]);
        BigEndian::write_u16(&mut buf[10..12], self.checksum);

        Ok(buf)
    }

    /// Parse a datagram from bytes
    ///
    /// The payload runs from the end of the header to the end of `data`,
    /// regardless of the total length field, so link-layer padding is kept.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < IPV4_HEADER_LEN {
            return Err(Error::TooShort {
                needed: IPV4_HEADER_LEN,
                available: data.len(),
            });
        }

        let ver_ihl = VersionIhl(data[0]);
        let header_len = ver_ihl.ihl() as usize * 4;
        if header_len < IPV4_HEADER_LEN {
            return Err(Error::InvalidHeaderLength(ver_ihl.ihl()));
        }
        if data.len() < header_len {
            return Err(Error::TooShort {
                needed: header_len,
                available: data.len(),
            });
        }

        let options = if header_len == IPV4_HEADER_LEN {
            Vec::new()
        } else {
            decode_options_until(&data[IPV4_HEADER_LEN..], header_len - IPV4_HEADER_LEN)?
        };

        Ok(Ipv4Packet {
            ver_ihl,
            tos: data[1],
            total_len: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            flags_frag_offset: FlagsFragOffset(BigEndian::read_u16(&data[6..8])),
            ttl: data[8],
            protocol: data[9],
            checksum: BigEndian::read_u16(&data[10..12]),
            src_addr: Ipv4Address::from_bytes(&data[12..16])?,
            dst_addr: Ipv4Address::from_bytes(&data[16..20])?,
            options,
            payload: data[header_len..].to_vec(),
        })
    }

    /// Validate the decoded header fields
    ///
    /// Checks the version, the header length range and that the total length
    /// covers the header.
    pub fn validate(&self) -> Result<()> {
        if self.version() != IPV4_VERSION {
            return Err(Error::InvalidVersion(self.version()));
        }

        if self.ihl() < DEFAULT_IHL {
            return Err(Error::InvalidHeaderLength(self.ihl()));
        }

        if (self.total_len as usize) < self.header_len() {
            return Err(Error::InvalidTotalLength {
                total_len: self.total_len,
                header_len: self.header_len(),
            });
        }

        Ok(())
    }
}

/// IPv4 protocol constants
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// IPv4 flags constants
pub mod flags {
    pub const DONT_FRAGMENT: u16 = 0x4000;
    pub const MORE_FRAGMENTS: u16 = 0x2000;
    pub const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::option::OptionType;
    use crate::network::verify_checksum;

    const LOCAL: Ipv4Address = Ipv4Address::new(1, 2, 3, 4);

    #[test]
    fn test_version_ihl() {
        assert_eq!(VersionIhl(79).version(), 4);
        assert_eq!(VersionIhl(78).ihl(), 14);
        assert_eq!(VersionIhl::new(4, 5).0, 0x45);
    }

    #[test]
    fn test_flags_frag_offset() {
        assert_eq!(FlagsFragOffset(65535).flags(), 7);
        assert_eq!(FlagsFragOffset(8191).flags(), 0);
        assert_eq!(FlagsFragOffset(65535).fragment_offset(), 8191);
        assert_eq!(FlagsFragOffset(8191).fragment_offset(), 8191);
        assert_eq!(FlagsFragOffset(57344).fragment_offset(), 0);

        let df = FlagsFragOffset::new(0b010, 100);
        assert!(df.dont_fragment());
        assert!(!df.more_fragments());
        assert_eq!(df.fragment_offset(), 100);
    }

    #[test]
    fn test_new_defaults() {
        let packet = Ipv4Packet::new(LOCAL, Ipv4Address::BROADCAST, &[1, 2, 3]);
        assert_eq!(packet.version(), 4);
        assert_eq!(packet.ihl(), 5);
        assert_eq!(packet.ttl, 64);
        assert_eq!(packet.protocol, protocol::TCP);
        assert_eq!(packet.id, 0);
        assert_eq!(packet.flags_frag_offset.0, 0);
        assert_eq!(packet.total_len, 23);
        assert_eq!(packet.payload_len(), 3);
    }

    #[test]
    fn test_encode_without_options() {
        let mut packet = Ipv4Packet::new(LOCAL, LOCAL, &[0]);
        let data = packet.encode().unwrap();

        assert_eq!(
            data,
            vec![
                0x45, 0, 0, 21, 0, 0, 0, 0, 64, 6, 0x72, 0xD8, 1, 2, 3, 4, 1, 2, 3, 4, 0
            ]
        );
        assert_eq!(packet.checksum, 0x72D8);
        assert!(verify_checksum(&data[..IPV4_HEADER_LEN]));
    }

    #[test]
    fn test_encode_with_options() {
        let mut packet = Ipv4Packet::new(LOCAL, LOCAL, &[0]).with_options([Ipv4Option {
            kind: OptionType(1),
            ..Default::default()
        }]);
        let data = packet.encode().unwrap();

        assert_eq!(
            data,
            vec![
                0x46, 0, 0, 25, 0, 0, 0, 0, 64, 6, 0x6F, 0xD3, 1, 2, 3, 4, 1, 2, 3, 4, 1, 1, 1, 0,
                0
            ]
        );
        assert_eq!(packet.ihl(), 6);
        assert_eq!(packet.total_len, 25);
        assert!(verify_checksum(&data[..24]));
    }

    #[test]
    fn test_encode_twice_is_stable() {
        let mut packet =
            Ipv4Packet::new(LOCAL, LOCAL, &[9, 9]).with_options([Ipv4Option::new(7u8, &[1])]);
        let first = packet.encode().unwrap();
        let second = packet.encode().unwrap();
        assert_eq!(first, second);
        assert_eq!(packet.total_len, 26);
    }

    #[test]
    fn test_encode_rejects_long_options() {
        let mut packet =
            Ipv4Packet::new(LOCAL, LOCAL, &[]).with_options([Ipv4Option::new(7u8, &[0; 40])]);
        assert!(matches!(packet.encode(), Err(Error::OptionsTooLong(44))));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PACKET_LEN - IPV4_HEADER_LEN + 1];
        let mut packet = Ipv4Packet::new(LOCAL, LOCAL, &payload);
        assert!(matches!(
            packet.encode(),
            Err(Error::PacketTooLarge(65536))
        ));
    }

    #[test]
    fn test_decode_without_options() {
        let data = [69, 0, 0, 21, 0, 0, 0, 0, 64, 6, 255, 255, 1, 2, 3, 4, 1, 2, 3, 4, 0];
        let packet = Ipv4Packet::decode(&data).unwrap();

        assert_eq!(packet.version(), 4);
        assert_eq!(packet.ihl(), 5);
        assert_eq!(packet.tos, 0);
        assert_eq!(packet.total_len, 21);
        assert_eq!(packet.id, 0);
        assert_eq!(packet.flags_frag_offset.flags(), 0);
        assert_eq!(packet.flags_frag_offset.fragment_offset(), 0);
        assert_eq!(packet.ttl, 64);
        assert_eq!(packet.protocol, 6);
        assert_eq!(packet.checksum, 0xFFFF);
        assert_eq!(packet.src_addr.to_string(), "1.2.3.4");
        assert_eq!(packet.dst_addr.to_string(), "1.2.3.4");
        assert!(packet.options.is_empty());
        assert_eq!(packet.payload, vec![0]);
    }

    #[test]
    fn test_decode_with_options() {
        let data = [
            71, 0, 0, 33, 0, 0, 0, 0, 64, 6, 255, 255, 1, 2, 3, 4, 1, 2, 3, 4, 134, 3, 14, 166, 3,
            15, 1, 0, 0, 1, 2, 3, 4,
        ];
        let packet = Ipv4Packet::decode(&data).unwrap();

        assert_eq!(packet.ihl(), 7);
        assert_eq!(packet.total_len as usize, data.len());

        let options: Vec<(u8, u8)> = packet
            .options
            .iter()
            .map(|o| (o.kind.0, o.length))
            .collect();
        assert_eq!(options, vec![(134, 3), (166, 3), (1, 0), (0, 0)]);
        assert_eq!(packet.payload, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_keeps_link_layer_padding() {
        let mut packet = Ipv4Packet::new(LOCAL, LOCAL, &[7]);
        let mut data = packet.encode().unwrap();
        data.resize(46, 0);

        let decoded = Ipv4Packet::decode(&data).unwrap();
        assert_eq!(decoded.total_len, 21);
        assert_eq!(decoded.payload.len(), 26);
        assert_eq!(decoded.payload[0], 7);
        assert_eq!(decoded.payload_len(), 1);
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Ipv4Packet::decode(&[0x45; 19]),
            Err(Error::TooShort {
                needed: 20,
                available: 19
            })
        ));

        let mut data = vec![0u8; 20];
        data[0] = 0x46;
        assert!(matches!(
            Ipv4Packet::decode(&data),
            Err(Error::TooShort {
                needed: 24,
                available: 20
            })
        ));
    }

    #[test]
    fn test_decode_invalid_header_length() {
        let mut data = vec![0u8; 20];
        data[0] = 0x44;
        assert!(matches!(
            Ipv4Packet::decode(&data),
            Err(Error::InvalidHeaderLength(4))
        ));
    }

    #[test]
    fn test_decode_option_overruns_header() {
        let mut data = vec![0u8; 28];
        data[0] = 0x46;
        data[20..26].copy_from_slice(&[1, 1, 7, 6, 0, 0]);
        assert!(matches!(
            Ipv4Packet::decode(&data),
            Err(Error::MalformedOptionsRegion { offset: 8, limit: 4 })
        ));
    }

    #[test]
    fn test_decode_truncated_option() {
        let mut data = vec![0u8; 24];
        data[0] = 0x46;
        data[20..24].copy_from_slice(&[1, 1, 7, 9]);
        assert!(matches!(
            Ipv4Packet::decode(&data),
            Err(Error::TruncatedOption { kind: 7, .. })
        ));
    }

    #[test]
    fn test_round_trip() {
        let options = vec![
            Ipv4Option::new(OptionType::new(true, 0, 8), &[0x12, 0x34]),
            Ipv4Option::new(7u8, &[0, 0, 0, 0, 0]),
        ];
        let mut packet = Ipv4Packet::new(LOCAL, Ipv4Address::new(10, 0, 0, 1), b"hello")
            .with_options(options.clone());
        packet.ttl = 3;
        packet.protocol = protocol::UDP;
        packet.id = 0xBEEF;
        let data = packet.encode().unwrap();

        let decoded = Ipv4Packet::decode(&data).unwrap();
        assert_eq!(decoded.src_addr, packet.src_addr);
        assert_eq!(decoded.dst_addr, packet.dst_addr);
        assert_eq!(decoded.ttl, 3);
        assert_eq!(decoded.protocol, protocol::UDP);
        assert_eq!(decoded.id, 0xBEEF);
        assert_eq!(decoded.payload, b"hello");
        assert_eq!(&decoded.options[..2], &options[..]);
        // 11 bytes of options need a single end-of-list octet to align
        assert_eq!(decoded.options[2..], [Ipv4Option::end_of_list()]);
        assert_eq!(decoded.header_len(), 32);
        assert_eq!(decoded.checksum, packet.checksum);
    }

    #[test]
    fn test_round_trip_padding_remainders() {
        let dst = Ipv4Address::new(10, 0, 0, 1);
        for nops in 0..4 {
            for value_len in 0..7u8 {
                for payload_len in [0usize, 1, 7] {
                    let value: Vec<u8> = (1..=value_len).collect();
                    let payload = vec![0x5A; payload_len];
                    let mut options = vec![Ipv4Option::no_operation(); nops];
                    options.push(Ipv4Option::new(0x44u8, &value));

                    let mut packet = Ipv4Packet::new(LOCAL, dst, &payload)
                        .with_options(options.clone());
                    let data = packet.encode().unwrap();
                    let padded = encode_options(&options);
                    assert_eq!(padded.len() % 4, 0);
                    assert_eq!(packet.header_len(), IPV4_HEADER_LEN + padded.len());

                    let unpadded = nops + 2 + value_len as usize;
                    let mut expected = options.clone();
                    if unpadded % 4 != 0 {
                        for _ in 0..3 - unpadded % 4 {
                            expected.push(Ipv4Option::no_operation());
                        }
                        expected.push(Ipv4Option::end_of_list());
                    }

                    let decoded = Ipv4Packet::decode(&data).unwrap();
                    assert_eq!(decoded.options, expected);
                    assert_eq!(decoded.header_len(), packet.header_len());
                    assert_eq!(decoded.total_len as usize, data.len());
                    assert_eq!(decoded.payload, payload);
                    assert!(verify_checksum(&data[..decoded.header_len()]));
                }
            }
        }
    }

    #[test]
    fn test_validate() {
        let mut packet = Ipv4Packet::new(LOCAL, LOCAL, &[]);
        packet.encode().unwrap();
        assert!(packet.validate().is_ok());

        let mut data = packet.encode().unwrap();
        data[0] = 0x65;
        assert!(matches!(
            Ipv4Packet::decode(&data).unwrap().validate(),
            Err(Error::InvalidVersion(6))
        ));

        data[0] = 0x45;
        data[3] = 10;
        assert!(matches!(
            Ipv4Packet::decode(&data).unwrap().validate(),
            Err(Error::InvalidTotalLength {
                total_len: 10,
                header_len: 20
            })
        ));
    }
}
