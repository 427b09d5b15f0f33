//! IPv4 header handling
//!
//! The router never reassembles or rewrites options; it only needs to read
//! the addressing fields of a received datagram and to build the small
//! headers it originates itself (RIP updates and ICMP errors).
//!
//! Addresses are kept as `u32` values holding the four octets in memory
//! order, the same representation the routing table uses.

use std::net::Ipv4Addr;

use crate::network::compute_checksum;
use byteorder::{BigEndian, ByteOrder, NativeEndian};

pub const IPV4_HEADER_LEN: usize = 20;
const IPV4_VERSION: u8 = 4;
const DEFAULT_IHL: u8 = 5; // 5 * 4 = 20 bytes (standard header length)
pub const DEFAULT_TTL: u8 = 64;

/// Offset of the time-to-live byte
pub const TTL_OFFSET: usize = 8;
/// Offset of the header checksum
pub const CHECKSUM_OFFSET: usize = 10;

/// IPv4 packet header structure
///
/// Represents the fixed 20-byte part of an IPv4 header as defined in RFC 791
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8, // Internet Header Length
    pub tos: u8, // Type of Service
    pub total_len: u16,
    pub id: u16,
    pub flags_frag_offset: u16, // Flags and Fragment Offset
    pub ttl: u8,                // Time to Live
    pub protocol: u8,           // Next Protocol
    pub checksum: u16,
    pub src_addr: u32, // Source IP Address, network byte order
    pub dst_addr: u32, // Destination IP Address, network byte order
}

impl Ipv4Header {
    /// Create a header for a datagram originated by the router.
    ///
    /// The checksum is left at zero; [`Ipv4Header::to_bytes`] fills it in.
    pub fn new(protocol: u8, ttl: u8, src_addr: u32, dst_addr: u32, payload_len: u16) -> Self {
        Ipv4Header {
            version: IPV4_VERSION,
            ihl: DEFAULT_IHL,
            tos: 0,
            total_len: IPV4_HEADER_LEN as u16 + payload_len,
            id: 0,
            flags_frag_offset: 0,
            ttl,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Parse IPv4 header from byte slice
    ///
    /// Returns None if the data is too short, if the version field is not 4
    /// or if the header length field is smaller than the fixed header.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < IPV4_HEADER_LEN {
            return None;
        }

        let version = (data[0] & 0xF0) >> 4;
        if version != IPV4_VERSION {
            return None;
        }
        let ihl = data[0] & 0x0F;
        if ihl < DEFAULT_IHL {
            return None;
        }

        Some(Ipv4Header {
            version,
            ihl,
            tos: data[1],
            total_len: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            flags_frag_offset: BigEndian::read_u16(&data[6..8]),
            ttl: data[TTL_OFFSET],
            protocol: data[9],
            checksum: BigEndian::read_u16(&data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2]),
            src_addr: NativeEndian::read_u32(&data[12..16]),
            dst_addr: NativeEndian::read_u32(&data[16..20]),
        })
    }

    /// Convert IPv4 header to bytes
    ///
    /// Serializes the fixed header with a freshly computed checksum.
    pub fn to_bytes(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = [0u8; IPV4_HEADER_LEN];
        bytes[0] = (self.version << 4) | DEFAULT_IHL;
        bytes[1] = self.tos;
        BigEndian::write_u16(&mut bytes[2..4], self.total_len);
        BigEndian::write_u16(&mut bytes[4..6], self.id);
        BigEndian::write_u16(&mut bytes[6..8], self.flags_frag_offset);
        bytes[TTL_OFFSET] = self.ttl;
        bytes[9] = self.protocol;
        NativeEndian::write_u32(&mut bytes[12..16], self.src_addr);
        NativeEndian::write_u32(&mut bytes[16..20], self.dst_addr);

        let checksum = compute_checksum(&bytes);
        BigEndian::write_u16(&mut bytes[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2], checksum);
        bytes
    }

    /// Get the header length in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    /// Get payload length
    ///
    /// Returns the length of the payload (total length - header length)
    pub fn payload_len(&self) -> usize {
        (self.total_len as usize).saturating_sub(self.header_len())
    }

    pub fn source(&self) -> Ipv4Addr {
        to_ipv4(self.src_addr)
    }

    pub fn destination(&self) -> Ipv4Addr {
        to_ipv4(self.dst_addr)
    }
}

/// IPv4 protocol constants
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const UDP: u8 = 17;
}

/// Network-order `u32` for an address.
pub fn from_ipv4(addr: Ipv4Addr) -> u32 {
    u32::from_ne_bytes(addr.octets())
}

/// Address for a network-order `u32`.
pub fn to_ipv4(addr: u32) -> Ipv4Addr {
    Ipv4Addr::from(addr.to_ne_bytes())
}
