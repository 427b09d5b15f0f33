//! UDP (User Datagram Protocol) framing
//!
//! RIP rides on UDP port 520. The router only needs to recognise that port
//! on inbound datagrams and to frame its own updates.

use crate::network::{checksum, ipv4::protocol};
use byteorder::{BigEndian, ByteOrder, NativeEndian};

/// UDP header length in bytes
pub const UDP_HEADER_LEN: usize = 8;

/// UDP packet header structure
///
/// Represents the standard 8-byte UDP header as defined in RFC 768
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16, // Length of UDP header and data
    pub checksum: u16,
}

impl UdpHeader {
    /// Parse UDP header from byte slice
    ///
    /// Returns None if the data is too short to contain a valid UDP header
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < UDP_HEADER_LEN {
            return None;
        }

        Some(UdpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            length: BigEndian::read_u16(&data[4..6]),
            checksum: BigEndian::read_u16(&data[6..8]),
        })
    }

    /// Convert UDP header to bytes
    pub fn to_bytes(&self) -> [u8; UDP_HEADER_LEN] {
        let mut bytes = [0u8; UDP_HEADER_LEN];
        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u16(&mut bytes[4..6], self.length);
        BigEndian::write_u16(&mut bytes[6..8], self.checksum);
        bytes
    }
}

/// Calculate UDP checksum with pseudo header
///
/// `src_ip` and `dst_ip` are network-order addresses.
pub fn udp_checksum(src_ip: u32, dst_ip: u32, udp_packet: &[u8]) -> u16 {
    let udp_len = udp_packet.len() as u16;

    // src_ip(4) + dst_ip(4) + zero(1) + protocol(1) + udp_len(2) = 12 bytes
    let mut pseudo_header = Vec::with_capacity(12 + udp_packet.len());
    let mut addr = [0u8; 4];
    NativeEndian::write_u32(&mut addr, src_ip);
    pseudo_header.extend_from_slice(&addr);
    NativeEndian::write_u32(&mut addr, dst_ip);
    pseudo_header.extend_from_slice(&addr);
    pseudo_header.push(0);
    pseudo_header.push(protocol::UDP);
    pseudo_header.extend_from_slice(&udp_len.to_be_bytes());
    pseudo_header.extend_from_slice(udp_packet);

    match checksum(&pseudo_header) {
        // A computed zero is sent as all ones; zero means "no checksum"
        0 => 0xffff,
        sum => sum,
    }
}

/// Creates a complete UDP datagram with a valid checksum.
pub fn create_udp_packet(
    src_ip: u32,
    dst_ip: u32,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let total_udp_len = UDP_HEADER_LEN + payload.len();

    let udp_header = UdpHeader {
        src_port,
        dst_port,
        length: total_udp_len as u16,
        checksum: 0,
    };

    let mut udp_packet = Vec::with_capacity(total_udp_len);
    udp_packet.extend_from_slice(&udp_header.to_bytes());
    udp_packet.extend_from_slice(payload);

    let checksum = udp_checksum(src_ip, dst_ip, &udp_packet);
    BigEndian::write_u16(&mut udp_packet[6..8], checksum);

    udp_packet
}
