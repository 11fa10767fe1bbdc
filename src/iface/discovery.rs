//! Interface and gateway address discovery
//!
//! The socket looks up its own addresses and those of the default gateway
//! once, when it is constructed. [`SystemDiscovery`] asks the Linux kernel;
//! [`StaticDiscovery`] hands back fixed values for devices the kernel knows
//! nothing useful about (a fresh TAP device has no gateway) and for tests.

use std::fs;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};
use crate::iface::ethernet::MacAddr;
use crate::iface::InterfaceInfo;
use crate::network::Ipv4Address;

const PROC_NET_ROUTE: &str = "/proc/net/route";
const PROC_NET_ARP: &str = "/proc/net/arp";

pub trait AddressDiscovery {
    /// IPv4 and hardware address assigned to interface `name`
    fn interface_info(&self, name: &str) -> Result<InterfaceInfo>;

    /// IPv4 and hardware address of the default gateway reached through `name`
    fn default_gateway_info(&self, name: &str) -> Result<InterfaceInfo>;
}

/// Discovery backed by procfs, sysfs and the `ip` tool
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDiscovery;

impl AddressDiscovery for SystemDiscovery {
    fn interface_info(&self, name: &str) -> Result<InterfaceInfo> {
        let hw_addr = fs::read_to_string(format!("/sys/class/net/{}/address", name))?;
        let hw_addr = MacAddr::parse(&hw_addr)?;

        // ip -4 -o addr show dev <name>
        let output = Command::new("ip")
            .arg("-4")
            .arg("-o")
            .arg("addr")
            .arg("show")
            .arg("dev")
            .arg(name)
            .output()?;
        if !output.status.success() {
            return Err(discovery_error(name, "`ip addr show` failed"));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let addr = parse_ip_addr_output(&stdout)
            .ok_or_else(|| discovery_error(name, "no IPv4 address assigned"))?;

        debug!(iface = name, %addr, %hw_addr, "interface discovered");
        Ok(InterfaceInfo { addr, hw_addr })
    }

    fn default_gateway_info(&self, name: &str) -> Result<InterfaceInfo> {
        let routes = fs::read_to_string(PROC_NET_ROUTE)?;
        let addr = parse_default_gateway(&routes, name)
            .ok_or_else(|| discovery_error(name, "no default route"))?;

        let neighbours = fs::read_to_string(PROC_NET_ARP)?;
        let hw_addr = parse_arp_entry(&neighbours, addr, name)
            .ok_or_else(|| discovery_error(name, "gateway hardware address unknown"))?;

        debug!(iface = name, %addr, %hw_addr, "gateway discovered");
        Ok(InterfaceInfo { addr, hw_addr })
    }
}

/// Discovery that always answers with the same addresses
#[derive(Debug, Clone, Copy)]
pub struct StaticDiscovery {
    pub interface: InterfaceInfo,
    pub gateway: InterfaceInfo,
}

impl StaticDiscovery {
    /// Run both lookups of `discovery` once and keep the answers
    pub fn resolve(discovery: &impl AddressDiscovery, name: &str) -> Result<Self> {
        Ok(StaticDiscovery {
            interface: discovery.interface_info(name)?,
            gateway: discovery.default_gateway_info(name)?,
        })
    }
}

impl AddressDiscovery for StaticDiscovery {
    fn interface_info(&self, _name: &str) -> Result<InterfaceInfo> {
        Ok(self.interface)
    }

    fn default_gateway_info(&self, _name: &str) -> Result<InterfaceInfo> {
        Ok(self.gateway)
    }
}

fn discovery_error(iface: &str, reason: &str) -> Error {
    Error::Discovery {
        iface: iface.to_string(),
        reason: reason.to_string(),
    }
}

/// First IPv4 address in `ip -4 -o addr show` output
///
/// Lines look like `2: eth0    inet 172.17.0.2/16 brd 172.17.255.255 scope global eth0`.
fn parse_ip_addr_output(output: &str) -> Option<Ipv4Address> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        fields.find(|field| *field == "inet")?;
        let cidr = fields.next()?;
        let addr = cidr.split('/').next()?;
        Ipv4Address::parse(addr).ok()
    })
}

/// Gateway of the default route through `iface` in /proc/net/route
///
/// Addresses in that file are hex words in host (little-endian) order.
fn parse_default_gateway(routes: &str, iface: &str) -> Option<Ipv4Address> {
    routes.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[0] != iface || fields[1] != "00000000" {
            return None;
        }
        let gateway = u32::from_str_radix(fields[2], 16).ok()?;
        Some(Ipv4Address(gateway.to_le_bytes()))
    })
}

/// Hardware address of `addr` on `iface` in /proc/net/arp
///
/// Incomplete entries (flags 0x0) are ignored.
fn parse_arp_entry(neighbours: &str, addr: Ipv4Address, iface: &str) -> Option<MacAddr> {
    neighbours.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 || fields[5] != iface || fields[2] == "0x0" {
            return None;
        }
        if Ipv4Address::parse(fields[0]).ok()? != addr {
            return None;
        }
        MacAddr::parse(fields[3]).ok()
    })
}
