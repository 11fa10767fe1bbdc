//! Frame transport over a TAP device
//!
//! A TAP device hands us complete Ethernet frames. Outgoing datagrams are
//! wrapped in an Ethernet header addressed to the configured peer, which
//! defaults to broadcast until the caller knows the gateway's hardware
//! address.

use tracing::{trace, warn};
use tun_tap::{Iface, Mode};

use crate::error::Result;
use crate::iface::ethernet::{ether_type, EthernetHeader, MacAddr, ETHERNET_HEADER_LEN};
use crate::iface::{Frame, FrameTransport};
use crate::network::ipv4::MAX_PACKET_LEN;

/// Largest IPv4 datagram + ethernet header + VLAN tag, so any MTU fits
const MAX_FRAME_LEN: usize = MAX_PACKET_LEN + ETHERNET_HEADER_LEN + 4;

pub struct TapTransport {
    iface: Iface,
    hw_addr: MacAddr,
    peer: MacAddr,
}

impl TapTransport {
    /// Attach to (or create) the TAP device `name`
    ///
    /// `hw_addr` is the source address written into outgoing frames.
    pub fn open(name: &str, hw_addr: MacAddr) -> Result<Self> {
        let iface = Iface::without_packet_info(name, Mode::Tap)?;
        trace!(iface = iface.name(), %hw_addr, "TAP device opened");

        Ok(TapTransport {
            iface,
            hw_addr,
            peer: MacAddr::BROADCAST,
        })
    }

    /// Address outgoing frames to `peer` instead of broadcast
    pub fn with_peer(mut self, peer: MacAddr) -> Self {
        self.peer = peer;
        self
    }

    pub fn set_peer(&mut self, peer: MacAddr) {
        self.peer = peer;
    }

    pub fn hw_addr(&self) -> MacAddr {
        self.hw_addr
    }

    pub fn peer(&self) -> MacAddr {
        self.peer
    }
}

impl FrameTransport for TapTransport {
    fn name(&self) -> &str {
        self.iface.name()
    }

    fn read_frame(&self) -> Result<Frame> {
        let mut buf = vec![0u8; MAX_FRAME_LEN];
        let nbytes = self.iface.recv(&mut buf)?;
        parse_frame(&buf[..nbytes], buf.len())
    }

    fn write_frame(&self, datagram: &[u8]) -> Result<()> {
        let header = EthernetHeader {
            dst: self.peer,
            src: self.hw_addr,
            ether_type: ether_type::IPV4,
        };
        let frame = header.frame(datagram);
        let nbytes = self.iface.send(&frame)?;
        trace!(dst = %self.peer, len = nbytes, "frame sent");
        Ok(())
    }
}

/// Split a received frame read into a buffer of `capacity` bytes
fn parse_frame(data: &[u8], capacity: usize) -> Result<Frame> {
    if data.len() >= capacity {
        warn!(len = data.len(), "frame filled the receive buffer and may be truncated");
    }

    let (header, payload) = EthernetHeader::parse(data)?;
    trace!(
        src = %header.src,
        dst = %header.dst,
        ether_type = header.ether_type,
        len = data.len(),
        "frame received"
    );

    Ok(Frame {
        ether_type: header.ether_type,
        payload: payload.to_vec(),
    })
}
