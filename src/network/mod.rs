//! Network layer implementation
//!
//! This module contains the IPv4 codec:
//! - Addresses
//! - Header options
//! - Datagram encoding and decoding
//! - Internet checksum

pub mod addr;
pub mod ipv4;
pub mod option;

// Re-export commonly used items
pub use addr::Ipv4Address;
pub use ipv4::{flags, protocol, FlagsFragOffset, Ipv4Packet, VersionIhl, IPV4_HEADER_LEN};
pub use option::{decode_options, encode_options, Ipv4Option, OptionType};

/// Calculate Internet checksum
///
/// Algorithm: Sum data in 16-bit chunks, add carry bits to the sum,
/// and return the one's complement of the result.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    // Process data in 2-byte chunks
    for chunk in data.chunks_exact(2) {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    // Handle odd-length data by padding with zero
    if data.len() % 2 != 0 {
        if let Some(&last_byte) = data.last() {
            sum += (last_byte as u32) << 8;
        }
    }

    // Add carry bits
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // Return one's complement
    !sum as u16
}

/// Check a header region that still carries its checksum field
///
/// The folded sum of a valid region is 0xFFFF, so its checksum is zero.
pub fn verify_checksum(header: &[u8]) -> bool {
    checksum(header) == 0
}
