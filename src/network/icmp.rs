//! ICMP (Internet Control Message Protocol) error messages
//!
//! A router only originates two kinds of ICMP traffic: Time Exceeded when a
//! datagram's TTL runs out and Destination Unreachable when no route exists.
//! Both quote the offending datagram's header plus the first 8 bytes of its
//! payload (RFC 792).

use byteorder::{BigEndian, ByteOrder};

use crate::network::ipv4::{protocol, Ipv4Header, DEFAULT_TTL};
use crate::network::checksum;

/// ICMP header length in bytes
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types
pub const ICMP_TYPE_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_TYPE_TIME_EXCEEDED: u8 = 11;

/// Payload bytes of the original datagram quoted after its header
const QUOTED_PAYLOAD_LEN: usize = 8;

/// ICMP packet header structure
///
/// Represents the standard 8-byte ICMP header as defined in RFC 792
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub msg_type: u8,  // ICMP message type
    pub msg_code: u8,  // ICMP message code
    pub checksum: u16, // ICMP checksum
    pub rest: [u8; 4], // Unused for error messages, must be zero
}

impl IcmpHeader {
    /// Parse ICMP header from byte slice
    ///
    /// Returns None if the data is too short to contain a valid ICMP header
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return None;
        }

        Some(IcmpHeader {
            msg_type: data[0],
            msg_code: data[1],
            checksum: BigEndian::read_u16(&data[2..4]),
            rest: [data[4], data[5], data[6], data[7]],
        })
    }

    /// Convert ICMP header to bytes
    pub fn to_bytes(&self) -> [u8; ICMP_HEADER_LEN] {
        let mut bytes = [0u8; ICMP_HEADER_LEN];
        bytes[0] = self.msg_type;
        bytes[1] = self.msg_code;
        BigEndian::write_u16(&mut bytes[2..4], self.checksum);
        bytes[4..8].copy_from_slice(&self.rest);
        bytes
    }
}

/// The ICMP errors the forwarding path can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpKind {
    /// Type 11, code 0: TTL exceeded in transit
    TimeExceeded,
    /// Type 3, code 0: network unreachable
    NetUnreachable,
}

impl IcmpKind {
    fn type_and_code(self) -> (u8, u8) {
        match self {
            IcmpKind::TimeExceeded => (ICMP_TYPE_TIME_EXCEEDED, 0),
            IcmpKind::NetUnreachable => (ICMP_TYPE_DEST_UNREACHABLE, 0),
        }
    }
}

/// Build a complete IPv4 datagram carrying an ICMP error about `original`.
///
/// The reply goes from `from` back to the original source. `original` must
/// hold at least a parsable IPv4 header; the quoted part is its header plus
/// up to 8 payload bytes, taken before any TTL rewrite.
pub fn error_message(kind: IcmpKind, from: u32, original: &[u8]) -> Option<Vec<u8>> {
    let original_header = Ipv4Header::from_bytes(original)?;
    let quoted_len = (original_header.header_len() + QUOTED_PAYLOAD_LEN).min(original.len());
    let quoted = &original[..quoted_len];

    let (msg_type, msg_code) = kind.type_and_code();
    let mut icmp = Vec::with_capacity(ICMP_HEADER_LEN + quoted.len());
    icmp.extend_from_slice(
        &IcmpHeader {
            msg_type,
            msg_code,
            checksum: 0,
            rest: [0; 4],
        }
        .to_bytes(),
    );
    icmp.extend_from_slice(quoted);
    let icmp_checksum = checksum(&icmp);
    BigEndian::write_u16(&mut icmp[2..4], icmp_checksum);

    let ip_header = Ipv4Header::new(
        protocol::ICMP,
        DEFAULT_TTL,
        from,
        original_header.src_addr,
        icmp.len() as u16,
    );

    let mut packet = Vec::with_capacity(ip_header.total_len as usize);
    packet.extend_from_slice(&ip_header.to_bytes());
    packet.extend_from_slice(&icmp);
    Some(packet)
}
