//! Error types shared by the codec, the transports and the socket.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed IPv4 address {0:?}")]
    MalformedAddress(String),
    #[error("IPv4 address must be 4 bytes, got {0}")]
    WrongLength(usize),
    #[error("buffer too short for IPv4 header: {available} bytes, need {needed}")]
    TooShort { needed: usize, available: usize },
    #[error("unsupported IP version {0}")]
    InvalidVersion(u8),
    #[error("invalid header length {0} words")]
    InvalidHeaderLength(u8),
    #[error("total length {total_len} is smaller than the {header_len}-byte header")]
    InvalidTotalLength { total_len: u16, header_len: usize },
    #[error("option {kind} declares {declared} bytes but only {available} remain")]
    TruncatedOption {
        kind: u8,
        declared: usize,
        available: usize,
    },
    #[error("option {kind} has invalid length {length}")]
    InvalidOptionLength { kind: u8, length: u8 },
    #[error("option ends at offset {offset}, past the {limit}-byte options region")]
    MalformedOptionsRegion { offset: usize, limit: usize },
    #[error("options region of {0} bytes exceeds 40")]
    OptionsTooLong(usize),
    #[error("datagram of {0} bytes exceeds 65535")]
    PacketTooLarge(usize),
    #[error("malformed MAC address {0:?}")]
    InvalidMacAddress(String),
    #[error("frame of {0} bytes is shorter than an ethernet header")]
    TruncatedFrame(usize),
    #[error("address discovery failed for {iface}: {reason}")]
    Discovery { iface: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
