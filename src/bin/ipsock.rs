//! Raw IPv4 over a TAP device
//!
//! Listens on a TAP interface and logs every IPv4 datagram, or sends a
//! single payload to a destination.
//!
//! ```sh
//! sudo ipsock --iface tap0 --addr 10.0.0.2 --hw-addr 02:00:00:00:00:02 \
//!     --gateway 10.0.0.1 --gateway-hw-addr 02:00:00:00:00:01
//! ```
//!
//! Without `--addr` the interface and gateway addresses are read from the
//! kernel, which only works for devices that already have them configured.

use std::process;

use clap::Parser;
use tracing::{error, info};

use ipsock::iface::{StaticDiscovery, SystemDiscovery, TapTransport};
use ipsock::{FrameTransport, InterfaceInfo, IpSocket, Ipv4Address, MacAddr, SocketConfig};

#[derive(Parser, Debug)]
#[command(name = "ipsock")]
#[command(about = "Send and receive raw IPv4 datagrams over a TAP device", long_about = None)]
struct Args {
    /// TAP device to attach to
    #[arg(short, long, default_value = "tap0")]
    iface: String,

    /// Local IPv4 address (skips kernel discovery)
    #[arg(long, requires_all = ["hw_addr", "gateway", "gateway_hw_addr"])]
    addr: Option<Ipv4Address>,

    /// Local hardware address
    #[arg(long)]
    hw_addr: Option<MacAddr>,

    /// Gateway IPv4 address
    #[arg(long)]
    gateway: Option<Ipv4Address>,

    /// Gateway hardware address
    #[arg(long)]
    gateway_hw_addr: Option<MacAddr>,

    /// Send PAYLOAD to this address instead of listening
    #[arg(short, long, requires = "payload")]
    send: Option<Ipv4Address>,

    /// Payload to send
    #[arg(short, long)]
    payload: Option<String>,

    /// IP protocol number for sent datagrams
    #[arg(long, default_value_t = 6)]
    protocol: u8,

    /// Time to live for sent datagrams
    #[arg(long, default_value_t = 64)]
    ttl: u8,

    /// Drop received datagrams with a bad header checksum
    #[arg(long)]
    verify_checksum: bool,
}

fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> ipsock::Result<()> {
    let config = SocketConfig {
        ttl: args.ttl,
        protocol: args.protocol,
        verify_checksum: args.verify_checksum,
        ..Default::default()
    };

    let discovery = match static_discovery(args) {
        Some(discovery) => discovery,
        None => StaticDiscovery::resolve(&SystemDiscovery, &args.iface)?,
    };
    serve(args, &discovery, config)
}

fn static_discovery(args: &Args) -> Option<StaticDiscovery> {
    Some(StaticDiscovery {
        interface: InterfaceInfo {
            addr: args.addr?,
            hw_addr: args.hw_addr?,
        },
        gateway: InterfaceInfo {
            addr: args.gateway?,
            hw_addr: args.gateway_hw_addr?,
        },
    })
}

fn serve(args: &Args, discovery: &StaticDiscovery, config: SocketConfig) -> ipsock::Result<()> {
    let transport = TapTransport::open(&args.iface, discovery.interface.hw_addr)?
        .with_peer(discovery.gateway.hw_addr);
    info!("TAP device attached: {}", transport.name());

    let socket = IpSocket::new(transport, discovery, config)?;
    info!(
        "local {} ({}), gateway {} ({})",
        socket.local_addr(),
        socket.hw_addr(),
        socket.gateway_addr(),
        socket.gateway_hw_addr()
    );

    if let (Some(to), Some(payload)) = (args.send, &args.payload) {
        socket.write_to(to, payload.as_bytes())?;
        info!("sent {} bytes to {}", payload.len(), to);
        return Ok(());
    }

    let mut packet_count = 0u64;
    loop {
        let packet = match socket.read_packet() {
            Ok(packet) => packet,
            Err(ipsock::Error::Io(e)) => return Err(e.into()),
            Err(e) => {
                error!("failed to decode datagram: {}", e);
                continue;
            }
        };

        packet_count += 1;
        let options: Vec<String> = packet.options.iter().map(ToString::to_string).collect();
        info!(
            "[#{}] {} -> {} proto={} ttl={} id={} len={} options=[{}] payload={} bytes",
            packet_count,
            packet.src_addr,
            packet.dst_addr,
            packet.protocol,
            packet.ttl,
            packet.id,
            packet.total_len,
            options.join(","),
            packet.payload.len()
        );
    }
}
