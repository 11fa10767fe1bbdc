//! Raw IP socket over a link-layer frame transport
//!
//! Inbound frames are filtered down to IPv4 and decoded into
//! [`Ipv4Packet`]s. Outbound payloads are wrapped into a fresh datagram
//! from the interface address to the connected destination, encoded and
//! handed to the transport.

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::iface::{ether_type, AddressDiscovery, FrameTransport, InterfaceInfo, MacAddr};
use crate::network::{protocol, verify_checksum, Ipv4Address, Ipv4Packet};

/// Socket configuration
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Destination used by [`IpSocket::write`] until [`IpSocket::connect`] is called
    pub default_destination: Ipv4Address,
    pub ttl: u8,
    pub protocol: u8,
    /// Drop inbound datagrams whose header checksum does not verify
    pub verify_checksum: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            default_destination: Ipv4Address::BROADCAST,
            ttl: 64,
            protocol: protocol::TCP,
            verify_checksum: false,
        }
    }
}

pub struct IpSocket<T> {
    transport: T,
    local: InterfaceInfo,
    gateway: InterfaceInfo,
    dst_addr: Ipv4Address,
    config: SocketConfig,
}

impl<T: FrameTransport> IpSocket<T> {
    /// Create a socket on top of `transport`
    ///
    /// The interface and gateway addresses are looked up once, here.
    pub fn new(
        transport: T,
        discovery: &impl AddressDiscovery,
        config: SocketConfig,
    ) -> Result<Self> {
        let local = discovery.interface_info(transport.name())?;
        let gateway = discovery.default_gateway_info(transport.name())?;
        debug!(
            iface = transport.name(),
            local = %local.addr,
            gateway = %gateway.addr,
            destination = %config.default_destination,
            "IP socket ready"
        );

        Ok(IpSocket {
            transport,
            local,
            gateway,
            dst_addr: config.default_destination,
            config,
        })
    }

    /// Name of the underlying interface
    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn local_addr(&self) -> Ipv4Address {
        self.local.addr
    }

    pub fn gateway_addr(&self) -> Ipv4Address {
        self.gateway.addr
    }

    /// Destination used by [`IpSocket::write`]
    pub fn destination(&self) -> Ipv4Address {
        self.dst_addr
    }

    pub fn hw_addr(&self) -> MacAddr {
        self.local.hw_addr
    }

    pub fn gateway_hw_addr(&self) -> MacAddr {
        self.gateway.hw_addr
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read the payload of the next IPv4 datagram
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(self.read_packet()?.payload)
    }

    /// Read the next IPv4 datagram
    ///
    /// Frames carrying other protocols are skipped. Decode errors are
    /// returned to the caller.
    pub fn read_packet(&self) -> Result<Ipv4Packet> {
        loop {
            let frame = self.transport.read_frame()?;
            if frame.ether_type != ether_type::IPV4 {
                trace!(ether_type = frame.ether_type, "skipping non-IPv4 frame");
                continue;
            }

            let packet = Ipv4Packet::decode(&frame.payload)?;
            if self.config.verify_checksum
                && !verify_checksum(&frame.payload[..packet.header_len()])
            {
                warn!(
                    src = %packet.src_addr,
                    checksum = packet.checksum,
                    "dropping datagram with bad header checksum"
                );
                continue;
            }

            trace!(
                src = %packet.src_addr,
                dst = %packet.dst_addr,
                protocol = packet.protocol,
                len = frame.payload.len(),
                "datagram received"
            );
            return Ok(packet);
        }
    }

    /// Set the destination for [`IpSocket::write`]
    pub fn connect(&mut self, to: Ipv4Address) {
        debug!(destination = %to, "socket connected");
        self.dst_addr = to;
    }

    /// Send `data` to the connected destination
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut packet = self.new_packet(self.dst_addr, data);
        self.write_packet(&mut packet)
    }

    /// Send `data` to `to`
    pub fn write_to(&self, to: Ipv4Address, data: &[u8]) -> Result<()> {
        let mut packet = self.new_packet(to, data);
        self.write_packet(&mut packet)
    }

    /// Encode and send a prepared datagram
    ///
    /// The header length, total length and checksum of `packet` are updated.
    pub fn write_packet(&self, packet: &mut Ipv4Packet) -> Result<()> {
        let data = packet.encode()?;
        trace!(
            dst = %packet.dst_addr,
            len = data.len(),
            checksum = packet.checksum,
            "sending datagram"
        );
        self.transport.write_frame(&data)
    }

    fn new_packet(&self, to: Ipv4Address, data: &[u8]) -> Ipv4Packet {
        let mut packet = Ipv4Packet::new(self.local.addr, to, data);
        packet.ttl = self.config.ttl;
        packet.protocol = self.config.protocol;
        packet
    }
}
