//! Link layer abstraction
//!
//! This module provides what the IP socket needs from below:
//! - Frame transports that move raw link-layer frames
//! - Ethernet framing
//! - Interface and gateway address discovery

pub mod discovery;
pub mod ethernet;
pub mod tap;

use crate::error::Result;
use crate::network::Ipv4Address;

// Re-export commonly used items
pub use discovery::{AddressDiscovery, StaticDiscovery, SystemDiscovery};
pub use ethernet::{ether_type, EthernetHeader, MacAddr};
pub use tap::TapTransport;

/// A received link-layer frame with its header stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ether_type: u16,
    pub payload: Vec<u8>,
}

/// Moves frames to and from a link-layer device
///
/// `read_frame` blocks until one frame arrives. `write_frame` wraps an IPv4
/// datagram in whatever link-layer header the transport uses.
pub trait FrameTransport {
    /// Name of the underlying device
    fn name(&self) -> &str;

    fn read_frame(&self) -> Result<Frame>;

    fn write_frame(&self, datagram: &[u8]) -> Result<()>;
}

/// Addresses assigned to an interface or its gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub addr: Ipv4Address,
    pub hw_addr: MacAddr,
}
