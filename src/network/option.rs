//! IPv4 header options (RFC 791 section 3.1)
//!
//! An option is either a single option-type octet (end of option list and
//! no operation) or an option-type octet followed by an option-length octet
//! and `length - 2` octets of option data.
//!
//! The option-type octet is viewed as having 3 fields:
//!
//! ```text
//! -0-1-2-3-4-5-6-7-
//! |C|Cls|  Number |
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// Option numbers from RFC 791
pub mod number {
    pub const END_OF_LIST: u8 = 0;
    pub const NO_OPERATION: u8 = 1;
    pub const SECURITY: u8 = 2;
    pub const LOOSE_SOURCE_ROUTE: u8 = 3;
    pub const TIMESTAMP: u8 = 4;
    pub const RECORD_ROUTE: u8 = 7;
    pub const STREAM_ID: u8 = 8;
    pub const STRICT_SOURCE_ROUTE: u8 = 9;
}

/// Option classes
pub mod class {
    pub const CONTROL: u8 = 0;
    pub const DEBUGGING: u8 = 2;
}

/// The option-type octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OptionType(pub u8);

impl OptionType {
    pub const END_OF_LIST: OptionType = OptionType(0x00);
    pub const NO_OPERATION: OptionType = OptionType(0x01);

    /// Build an option type from its copied flag, class and number
    pub const fn new(copied: bool, class: u8, number: u8) -> Self {
        OptionType(((copied as u8) << 7) | ((class & 0x03) << 5) | (number & 0x1F))
    }

    /// Whether the option is copied into all fragments
    pub fn is_copied(&self) -> bool {
        self.0 >> 7 == 1
    }

    pub fn class(&self) -> u8 {
        (self.0 >> 5) & 0x03
    }

    pub fn number(&self) -> u8 {
        self.0 & 0x1F
    }

    /// End of option list and no operation carry neither length nor value
    pub fn is_single_octet(&self) -> bool {
        matches!(self.number(), number::END_OF_LIST | number::NO_OPERATION)
    }

    pub fn is_end_of_list(&self) -> bool {
        self.number() == number::END_OF_LIST
    }
}

impl From<u8> for OptionType {
    fn from(value: u8) -> Self {
        OptionType(value)
    }
}

/// A single IPv4 header option
///
/// `length` is the total option size including the type and length octets.
/// It is only meaningful for multi-octet options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv4Option {
    pub kind: OptionType,
    pub length: u8,
    pub value: Vec<u8>,
}

impl Ipv4Option {
    /// Create an option whose length is derived from the value
    ///
    /// Values longer than 253 bytes cannot be described by the length octet
    /// and are cut to fit. Single-octet option types drop the value.
    pub fn new(kind: impl Into<OptionType>, value: &[u8]) -> Self {
        let kind = kind.into();
        if kind.is_single_octet() {
            return Ipv4Option {
                kind,
                ..Default::default()
            };
        }

        let value = &value[..value.len().min(u8::MAX as usize - 2)];
        Ipv4Option {
            kind,
            length: value.len() as u8 + 2,
            value: value.to_vec(),
        }
    }

    pub fn no_operation() -> Self {
        Ipv4Option {
            kind: OptionType::NO_OPERATION,
            ..Default::default()
        }
    }

    pub fn end_of_list() -> Self {
        Ipv4Option {
            kind: OptionType::END_OF_LIST,
            ..Default::default()
        }
    }

    /// Number of bytes this option occupies once encoded
    pub fn encoded_len(&self) -> usize {
        if self.kind.is_single_octet() {
            1
        } else {
            2 + self.value_len()
        }
    }

    fn value_len(&self) -> usize {
        self.length.saturating_sub(2) as usize
    }

    /// Append the wire form of this option to `buf`
    ///
    /// Exactly `length - 2` value bytes are written: a longer value is
    /// truncated and a shorter one is zero-filled.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.kind.0);
        if self.kind.is_single_octet() {
            return;
        }

        buf.push(self.length);
        let value_len = self.value_len();
        let copied = value_len.min(self.value.len());
        buf.extend_from_slice(&self.value[..copied]);
        buf.resize(buf.len() + (value_len - copied), 0);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one option from the front of `data`
    ///
    /// Returns the option and the number of bytes it consumed, or `None` when
    /// `data` is empty.
    pub fn decode(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let Some(&type_octet) = data.first() else {
            return Ok(None);
        };

        let kind = OptionType(type_octet);
        if kind.is_single_octet() {
            return Ok(Some((
                Ipv4Option {
                    kind,
                    ..Default::default()
                },
                1,
            )));
        }

        if data.len() < 2 {
            return Err(Error::TruncatedOption {
                kind: type_octet,
                declared: 2,
                available: data.len(),
            });
        }

        let length = data[1];
        if length < 2 {
            return Err(Error::InvalidOptionLength {
                kind: type_octet,
                length,
            });
        }

        let declared = length as usize;
        if declared > data.len() {
            return Err(Error::TruncatedOption {
                kind: type_octet,
                declared,
                available: data.len(),
            });
        }

        Ok(Some((
            Ipv4Option {
                kind,
                length,
                value: data[2..declared].to_vec(),
            },
            declared,
        )))
    }
}

impl fmt::Display for Ipv4Option {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.number() {
            number::END_OF_LIST => write!(f, "EOL"),
            number::NO_OPERATION => write!(f, "NOP"),
            _ => write!(f, "OPT({}, len={})", self.kind.0, self.length),
        }
    }
}

/// Encode options back to back and pad the result to a 32-bit boundary
///
/// Padding is no-operation octets up to one byte short of the boundary,
/// followed by a single end-of-list octet. An already aligned sequence,
/// including an empty one, is left untouched.
pub fn encode_options(options: &[Ipv4Option]) -> Vec<u8> {
    let encoded_len: usize = options.iter().map(Ipv4Option::encoded_len).sum();
    let mut buf = Vec::with_capacity(encoded_len + 3);
    for option in options {
        option.encode_into(&mut buf);
    }

    if buf.len() % 4 != 0 {
        while buf.len() % 4 != 3 {
            Ipv4Option::no_operation().encode_into(&mut buf);
        }
        Ipv4Option::end_of_list().encode_into(&mut buf);
    }

    buf
}

/// Decode a bare options region
///
/// Stops after an end-of-list option or at the end of the region.
pub fn decode_options(region: &[u8]) -> Result<Vec<Ipv4Option>> {
    decode_options_until(region, region.len())
}

/// Decode options from `data` until an end-of-list option or until `end`
/// bytes have been consumed. Options may extend past `end` only as far as
/// `data` goes; doing so is reported as a malformed region.
pub(crate) fn decode_options_until(data: &[u8], end: usize) -> Result<Vec<Ipv4Option>> {
    let mut options = Vec::new();
    let mut cursor = 0;

    while cursor < end {
        let Some((option, consumed)) = Ipv4Option::decode(&data[cursor..])? else {
            break;
        };

        cursor += consumed;
        if cursor > end {
            return Err(Error::MalformedOptionsRegion { offset: cursor, limit: end });
        }

        let end_of_list = option.kind.is_end_of_list();
        options.push(option);
        if end_of_list {
            break;
        }
    }

    Ok(options)
}
