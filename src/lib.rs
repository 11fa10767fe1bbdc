//! IPv4 datagram codec and raw IP socket
//!
//! This library provides:
//! - IPv4 header encoding and decoding, including header options
//! - Internet checksum calculation
//! - Link-layer frame transport over a TAP device
//! - A raw IP socket that reads and writes datagrams over that transport

pub mod error;
pub mod iface;
pub mod network;
pub mod socket;

// Re-export commonly used types
pub use error::{Error, Result};
pub use iface::{AddressDiscovery, Frame, FrameTransport, InterfaceInfo, MacAddr};
pub use network::{Ipv4Address, Ipv4Option, Ipv4Packet, OptionType};
pub use socket::{IpSocket, SocketConfig};
