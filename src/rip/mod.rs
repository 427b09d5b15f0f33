//! RIP version 2 messages
//!
//! See RFC 2453. A message is a 4-byte header (command, version, two zero
//! bytes) followed by up to 25 route records of 20 bytes each:
//!
//! ```text
//!  0                   1                   2                   3
//! +-------------------------------+-------------------------------+
//! | address family (0 req, 2 rsp) |          route tag (0)        |
//! +-------------------------------+-------------------------------+
//! |                          IP address                           |
//! |                          subnet mask                          |
//! |                           next hop                            |
//! |                            metric                             |
//! +---------------------------------------------------------------+
//! ```
//!
//! Authentication records and RIPv1 messages are not supported.

pub mod codec;

use std::net::Ipv4Addr;

use thiserror::Error as ThisError;

pub use codec::{assemble, build_datagram, build_datagram_to, disassemble};

/// UDP port RIP listens and sends on
pub const RIP_PORT: u16 = 520;
/// The RIPv2 multicast group, 224.0.0.9
pub const RIP_MULTICAST: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 9);
/// Route records allowed in one message
pub const MAX_ENTRIES: usize = 25;
/// The only version this router speaks
pub const RIP_VERSION: u8 = 2;

/// Length of the command/version/zero header
pub const RIP_HEADER_LEN: usize = 4;
/// Length of one route record
pub const RIP_ENTRY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Request = 1,
    Response = 2,
}

impl Command {
    /// The address family every record of a message with this command carries.
    pub fn family(self) -> u16 {
        match self {
            Command::Request => 0,
            Command::Response => 2,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Command::Request),
            2 => Ok(Command::Response),
            other => Err(FormatError::BadCommand(other)),
        }
    }
}

/// One route record as carried on the wire.
///
/// Every field holds its four bytes in wire order; use `u32::from_be` to
/// read the mask or metric as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RipRouteEntry {
    pub address: u32,
    pub mask: u32,
    pub next_hop: u32,
    pub metric: u32,
}

impl RipRouteEntry {
    /// The metric as a host integer.
    pub fn host_metric(&self) -> u32 {
        u32::from_be(self.metric)
    }
}

/// A parsed or about-to-be-sent RIP message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RipMessage {
    pub command: Command,
    pub entries: Vec<RipRouteEntry>,
}

impl RipMessage {
    pub fn new(command: Command, entries: Vec<RipRouteEntry>) -> Self {
        RipMessage { command, entries }
    }

    /// A request for the neighbour's whole table (RFC 2453 3.9.1): a single
    /// record with address 0 and metric 16.
    pub fn full_table_request() -> Self {
        RipMessage {
            command: Command::Request,
            entries: vec![RipRouteEntry {
                address: 0,
                mask: 0,
                next_hop: 0,
                metric: 16u32.to_be(),
            }],
        }
    }

    /// Whether this is a request for the whole routing table.
    pub fn is_full_table_request(&self) -> bool {
        self.command == Command::Request
            && self.entries.len() == 1
            && self.entries[0].address == 0
            && self.entries[0].host_metric() == 16
    }
}

/// Why a received datagram is not an acceptable RIP message.
#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("Not an IPv4 datagram")]
    NotIpv4,
    #[error("The datagram is shorter than its headers claim")]
    Truncated,
    #[error("The IPv4 header length field is below 5 words")]
    BadHeaderLength,
    #[error("Unknown RIP command {0}")]
    BadCommand(u8),
    #[error("Expected RIP version 2, got {0}")]
    BadVersion(u8),
    #[error("Address family {0} does not match the command")]
    BadFamily(u16),
    #[error("Route tag {0} is not zero")]
    BadTag(u16),
    #[error("Subnet mask {0:#010x} is not contiguous")]
    BadMask(u32),
    #[error("Metric {0} is outside 1..=16")]
    BadMetric(u32),
    #[error("More than 25 route entries")]
    TooManyEntries,
}
