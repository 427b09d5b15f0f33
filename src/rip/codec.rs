//! Conversion between RIP messages and bytes.
//!
//! Parsing is all-or-nothing: the first bad record rejects the whole
//! message, so nothing downstream ever sees half a message.

use byteorder::{BigEndian, ByteOrder, NativeEndian};

use super::{
    Command, FormatError, RipMessage, RipRouteEntry, MAX_ENTRIES, RIP_ENTRY_LEN, RIP_HEADER_LEN,
    RIP_PORT, RIP_VERSION,
};
use crate::network::ipv4::{protocol, Ipv4Header, IPV4_HEADER_LEN};
use crate::route::is_contiguous_mask;
use crate::transport::{create_udp_packet, UDP_HEADER_LEN};

/// TTL of originated RIP datagrams; updates never leave the link.
const RIP_TTL: u8 = 1;

/// Parse the RIP message carried by an IPv4/UDP datagram.
///
/// `datagram` is the received IP datagram; its length is the number of bytes
/// actually received. Neither the IP nor the UDP checksum is checked here.
pub fn disassemble(datagram: &[u8]) -> Result<RipMessage, FormatError> {
    if datagram.len() < IPV4_HEADER_LEN {
        return Err(FormatError::Truncated);
    }
    let total_len = BigEndian::read_u16(&datagram[2..4]) as usize;
    if total_len > datagram.len() {
        return Err(FormatError::Truncated);
    }

    let ihl = (datagram[0] & 0x0F) as usize;
    if ihl < 5 {
        return Err(FormatError::BadHeaderLength);
    }
    let mut p = ihl * 4 + UDP_HEADER_LEN;
    if p + RIP_HEADER_LEN > total_len {
        return Err(FormatError::Truncated);
    }

    let command = Command::try_from(datagram[p])?;
    let version = datagram[p + 1];
    if version != RIP_VERSION {
        return Err(FormatError::BadVersion(version));
    }
    p += RIP_HEADER_LEN;

    let mut entries = Vec::new();
    while p < total_len {
        if entries.len() == MAX_ENTRIES {
            return Err(FormatError::TooManyEntries);
        }
        if p + RIP_ENTRY_LEN > total_len {
            return Err(FormatError::Truncated);
        }
        entries.push(parse_entry(&datagram[p..p + RIP_ENTRY_LEN], command)?);
        p += RIP_ENTRY_LEN;
    }

    Ok(RipMessage { command, entries })
}

fn parse_entry(record: &[u8], command: Command) -> Result<RipRouteEntry, FormatError> {
    let family = BigEndian::read_u16(&record[0..2]);
    if family != command.family() {
        return Err(FormatError::BadFamily(family));
    }
    let tag = BigEndian::read_u16(&record[2..4]);
    if tag != 0 {
        return Err(FormatError::BadTag(tag));
    }

    let entry = RipRouteEntry {
        address: NativeEndian::read_u32(&record[4..8]),
        mask: NativeEndian::read_u32(&record[8..12]),
        next_hop: NativeEndian::read_u32(&record[12..16]),
        metric: NativeEndian::read_u32(&record[16..20]),
    };

    let host_mask = u32::from_be(entry.mask);
    if !is_contiguous_mask(host_mask) {
        return Err(FormatError::BadMask(host_mask));
    }
    let metric = entry.host_metric();
    if !(1..=16).contains(&metric) {
        return Err(FormatError::BadMetric(metric));
    }

    Ok(entry)
}

/// Serialize a message into its RIP bytes (no IP or UDP header).
///
/// The output is `4 + 20 * entries` bytes. Keeping a message within 25
/// entries is the caller's job.
pub fn assemble(message: &RipMessage) -> Vec<u8> {
    let mut buffer = vec![0u8; RIP_HEADER_LEN + RIP_ENTRY_LEN * message.entries.len()];
    buffer[0] = message.command as u8;
    buffer[1] = RIP_VERSION;

    let family = message.command.family();
    for (record, entry) in buffer[RIP_HEADER_LEN..]
        .chunks_exact_mut(RIP_ENTRY_LEN)
        .zip(&message.entries)
    {
        BigEndian::write_u16(&mut record[0..2], family);
        NativeEndian::write_u32(&mut record[4..8], entry.address);
        NativeEndian::write_u32(&mut record[8..12], entry.mask);
        NativeEndian::write_u32(&mut record[12..16], entry.next_hop);
        NativeEndian::write_u32(&mut record[16..20], entry.metric);
    }

    buffer
}

/// Frame a message as a complete IPv4/UDP datagram from port 520 to port 520.
///
/// Addresses are network-order `u32`s.
pub fn build_datagram(source: u32, destination: u32, message: &RipMessage) -> Vec<u8> {
    build_datagram_to(source, destination, RIP_PORT, message)
}

/// Like [`build_datagram`], but to `port`: answers to a request go back to
/// the port it came from.
pub fn build_datagram_to(source: u32, destination: u32, port: u16, message: &RipMessage) -> Vec<u8> {
    let udp = create_udp_packet(source, destination, RIP_PORT, port, &assemble(message));
    let header = Ipv4Header::new(protocol::UDP, RIP_TTL, source, destination, udp.len() as u16);

    let mut packet = Vec::with_capacity(header.total_len as usize);
    packet.extend_from_slice(&header.to_bytes());
    packet.extend_from_slice(&udp);
    packet
}
