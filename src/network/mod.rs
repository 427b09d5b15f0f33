//! Network layer protocols implementation
//!
//! This module contains the network layer pieces the router needs:
//! - IPv4: header parsing and the header checksum
//! - ICMP: the error messages a router emits while forwarding

pub mod icmp;
pub mod ipv4;

// Re-export commonly used items
pub use icmp::{IcmpHeader, IcmpKind};
pub use ipv4::{Ipv4Header, protocol};

/// Offset of the header checksum inside an IPv4 header
const CHECKSUM_OFFSET: usize = 10;

/// Calculate Internet checksum
///
/// Algorithm: Sum data in 16-bit chunks, add carry bits to the sum,
/// and return the one's complement of the result.
/// This is used for IP, UDP and ICMP checksums.
pub fn checksum(data: &[u8]) -> u16 {
    fold(sum_words(data))
}

/// Compute the IPv4 header checksum.
///
/// Only the header region declared by the IHL field is summed, bounded by
/// the length of `header`. The stored checksum field counts as zero.
pub fn compute_checksum(header: &[u8]) -> u16 {
    let end = declared_header_len(header).min(header.len());
    let region = &header[..end];

    let mut sum = sum_words(region);
    if region.len() >= CHECKSUM_OFFSET + 2 {
        sum -= u16::from_be_bytes([region[CHECKSUM_OFFSET], region[CHECKSUM_OFFSET + 1]]) as u32;
    }
    fold(sum)
}

/// Validate the IPv4 header checksum of `packet`.
///
/// Returns false when the header length field is below 5 words or claims
/// more bytes than the buffer holds.
pub fn validate_checksum(packet: &[u8]) -> bool {
    if packet.len() < ipv4::IPV4_HEADER_LEN {
        return false;
    }
    let header_len = declared_header_len(packet);
    if header_len < ipv4::IPV4_HEADER_LEN || header_len > packet.len() {
        return false;
    }

    let stored = u16::from_be_bytes([packet[CHECKSUM_OFFSET], packet[CHECKSUM_OFFSET + 1]]);
    compute_checksum(packet) == stored
}

/// Adjust a checksum after one 16-bit word of the covered data changed.
///
/// RFC 1624, eqn. 3: `HC' = ~(~HC + ~m + m')`.
pub fn incremental_update(checksum: u16, old_word: u16, new_word: u16) -> u16 {
    let sum = (!checksum) as u32 + (!old_word) as u32 + new_word as u32;
    fold(sum)
}

fn declared_header_len(header: &[u8]) -> usize {
    header.first().map_or(0, |b| ((b & 0x0F) as usize) * 4)
}

fn sum_words(data: &[u8]) -> u32 {
    let mut sum = 0u32;

    // Process data in 2-byte chunks
    for chunk in data.chunks_exact(2) {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    // Handle odd-length data by padding with zero
    if data.len() % 2 != 0 {
        if let Some(&last_byte) = data.last() {
            sum += (last_byte as u32) << 8;
        }
    }

    sum
}

fn fold(mut sum: u32) -> u16 {
    // Add carry bits
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // Return one's complement
    !sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    // 192.168.0.1 -> 192.168.0.199, UDP, TTL 64 (the usual worked example)
    fn sample_header() -> Vec<u8> {
        vec![
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0x61, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ]
    }

    #[test]
    fn test_compute_ignores_stored_field() {
        let mut header = sample_header();
        assert_eq!(compute_checksum(&header), 0xb861);

        header[10] = 0xde;
        header[11] = 0xad;
        assert_eq!(compute_checksum(&header), 0xb861);
    }

    #[test]
    fn test_validate() {
        let header = sample_header();
        assert!(validate_checksum(&header));

        let mut bad = header.clone();
        bad[11] ^= 0x01;
        assert!(!validate_checksum(&bad));
    }

    #[test]
    fn test_single_bit_flip_invalidates() {
        let header = sample_header();
        for byte in (0..header.len()).filter(|i| *i != 10 && *i != 11) {
            for bit in 0..8 {
                let mut flipped = header.clone();
                flipped[byte] ^= 1 << bit;
                assert!(
                    !validate_checksum(&flipped),
                    "flip of byte {} bit {} went unnoticed",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_validate_bounds_header_length() {
        let mut header = sample_header();
        // IHL of 6 words claims 24 bytes but the buffer only holds 20
        header[0] = 0x46;
        assert!(!validate_checksum(&header));

        header[0] = 0x44;
        assert!(!validate_checksum(&header));

        assert!(!validate_checksum(&header[..12]));
    }

    #[test]
    fn test_compute_uses_declared_length_only() {
        let mut packet = sample_header();
        packet.extend_from_slice(&[0xff; 16]);
        assert_eq!(compute_checksum(&packet), 0xb861);
        assert!(validate_checksum(&packet));
    }

    #[test]
    fn test_incremental_matches_recompute() {
        for ttl in 1..=255u8 {
            let mut header = sample_header();
            header[8] = ttl;
            let sum = compute_checksum(&header);
            header[10..12].copy_from_slice(&sum.to_be_bytes());

            let old_word = u16::from_be_bytes([header[8], header[9]]);
            header[8] -= 1;
            let new_word = u16::from_be_bytes([header[8], header[9]]);

            let incremental = incremental_update(sum, old_word, new_word);
            assert_eq!(incremental, compute_checksum(&header), "ttl {}", ttl);
        }
    }

    #[test]
    fn test_checksum_odd_length() {
        assert_eq!(checksum(&[0x01]), !0x0100);
        assert_eq!(checksum(&[]), 0xffff);
    }
}
