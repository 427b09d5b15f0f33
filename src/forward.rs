//! The forwarding decision for datagrams not addressed to the router.

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, trace};

use crate::iface::{LinkLayer, MacAddr};
use crate::network::icmp::{error_message, IcmpKind};
use crate::network::ipv4::{to_ipv4, Ipv4Header, CHECKSUM_OFFSET, TTL_OFFSET};
use crate::network::{incremental_update, validate_checksum};
use crate::route::{InterfaceId, RoutingTable};

/// What to do with a transit datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send `packet` (TTL already decremented) out of `interface` to `link_addr`.
    Forward {
        interface: InterfaceId,
        link_addr: MacAddr,
        packet: Vec<u8>,
    },
    /// The TTL ran out; `reply` is the ICMP Time Exceeded for the source.
    TtlExceeded { reply: Vec<u8> },
    /// No usable route; `reply` is an ICMP Network Unreachable for the source.
    Unreachable { reply: Vec<u8> },
    /// The next hop has no known link address yet.
    NoLinkAddress {
        interface: InterfaceId,
        next_hop: u32,
    },
    /// The header is unparsable, its checksum is wrong, or its total
    /// length disagrees with the bytes received.
    Malformed,
}

/// Decide how to forward `packet`.
///
/// ICMP replies are sourced from `reply_from`, the address of the interface
/// the datagram arrived on.
pub fn forward<L: LinkLayer + ?Sized>(
    table: &RoutingTable,
    link: &mut L,
    packet: &[u8],
    reply_from: u32,
) -> Decision {
    let Some(header) = Ipv4Header::from_bytes(packet) else {
        return Decision::Malformed;
    };
    // bytes past the total length are link padding and are not forwarded
    let total_len = header.total_len as usize;
    if total_len < header.header_len() || total_len > packet.len() {
        debug!(total_len, received = packet.len(), "total length disagrees with datagram");
        return Decision::Malformed;
    }
    let packet = &packet[..total_len];

    let route = match table.lookup(header.dst_addr) {
        Some(route) if route.is_reachable() => route,
        _ => {
            debug!(destination = %header.destination(), "no route");
            return match error_message(IcmpKind::NetUnreachable, reply_from, packet) {
                Some(reply) => Decision::Unreachable { reply },
                None => Decision::Malformed,
            };
        }
    };

    let next_hop = if route.is_direct() {
        header.dst_addr
    } else {
        route.next_hop
    };

    let Some(link_addr) = link.resolve_link_address(route.egress_interface, next_hop) else {
        return Decision::NoLinkAddress {
            interface: route.egress_interface,
            next_hop,
        };
    };

    if !validate_checksum(packet) {
        return Decision::Malformed;
    }

    if header.ttl <= 1 {
        return match error_message(IcmpKind::TimeExceeded, reply_from, packet) {
            Some(reply) => Decision::TtlExceeded { reply },
            None => Decision::Malformed,
        };
    }

    let mut packet = packet.to_vec();
    decrement_ttl(&mut packet);
    trace!(
        destination = %header.destination(),
        next_hop = %to_ipv4(next_hop),
        interface = route.egress_interface,
        "forwarding"
    );

    Decision::Forward {
        interface: route.egress_interface,
        link_addr,
        packet,
    }
}

/// Decrement the TTL of a header with a valid checksum and TTL above zero,
/// patching the checksum in place.
pub fn decrement_ttl(packet: &mut [u8]) {
    let old_word = BigEndian::read_u16(&packet[TTL_OFFSET..TTL_OFFSET + 2]);
    packet[TTL_OFFSET] -= 1;
    let new_word = BigEndian::read_u16(&packet[TTL_OFFSET..TTL_OFFSET + 2]);

    let checksum = BigEndian::read_u16(&packet[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2]);
    BigEndian::write_u16(
        &mut packet[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2],
        incremental_update(checksum, old_word, new_word),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::Received;
    use crate::network::compute_checksum;
    use crate::network::icmp::{ICMP_TYPE_DEST_UNREACHABLE, ICMP_TYPE_TIME_EXCEEDED};
    use crate::network::ipv4::{protocol, IPV4_HEADER_LEN};
    use crate::route::Route;
    use std::collections::HashMap;
    use std::io;

    fn addr(octets: [u8; 4]) -> u32 {
        u32::from_ne_bytes(octets)
    }

    /// A link that knows a fixed set of neighbours.
    #[derive(Default)]
    struct Neighbours {
        known: HashMap<(InterfaceId, u32), MacAddr>,
        asked: Vec<(InterfaceId, u32)>,
    }

    impl LinkLayer for Neighbours {
        fn recv_frame(&mut self, _buf: &mut [u8]) -> io::Result<Received> {
            Ok(Received::Closed)
        }

        fn send_frame(&mut self, _: InterfaceId, _: &[u8], _: MacAddr) -> io::Result<()> {
            Ok(())
        }

        fn resolve_link_address(&mut self, interface: InterfaceId, next_hop: u32) -> Option<MacAddr> {
            self.asked.push((interface, next_hop));
            self.known.get(&(interface, next_hop)).copied()
        }
    }

    const MAC: MacAddr = [2, 0, 0, 0, 0, 7];
    const ROUTER: [u8; 4] = [10, 0, 0, 1];

    fn table() -> RoutingTable {
        let mut table = RoutingTable::new();
        table.upsert(Route::direct(addr([10, 0, 0, 0]), 24, 0));
        table.upsert(Route::direct(addr([10, 0, 1, 0]), 24, 1));
        table.upsert(Route {
            prefix: addr([10, 0, 5, 0]),
            prefix_len: 24,
            egress_interface: 1,
            next_hop: addr([10, 0, 1, 2]),
            metric: 2,
            learned_from_interface: 1,
        });
        table.upsert(Route {
            prefix: addr([10, 0, 6, 0]),
            prefix_len: 24,
            egress_interface: 1,
            next_hop: addr([10, 0, 1, 2]),
            metric: 16,
            learned_from_interface: 1,
        });
        table
    }

    fn datagram(dst: [u8; 4], ttl: u8) -> Vec<u8> {
        let payload = [0xabu8; 12];
        let header = Ipv4Header::new(
            protocol::UDP,
            ttl,
            addr([10, 0, 0, 2]),
            addr(dst),
            payload.len() as u16,
        );
        let mut packet = header.to_bytes().to_vec();
        packet.extend_from_slice(&payload);
        packet
    }

    fn neighbours() -> Neighbours {
        let mut link = Neighbours::default();
        link.known.insert((1, addr([10, 0, 1, 2])), MAC);
        link.known.insert((1, addr([10, 0, 1, 9])), MAC);
        link
    }

    #[test]
    fn test_forward_via_router() {
        let mut link = neighbours();
        let packet = datagram([10, 0, 5, 7], 2);

        match forward(&table(), &mut link, &packet, addr(ROUTER)) {
            Decision::Forward {
                interface,
                link_addr,
                packet: out,
            } => {
                assert_eq!(interface, 1);
                assert_eq!(link_addr, MAC);
                assert_eq!(out[TTL_OFFSET], 1);
                assert!(validate_checksum(&out));
                let stored = BigEndian::read_u16(&out[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2]);
                assert_eq!(stored, compute_checksum(&out));
                assert_eq!(&out[IPV4_HEADER_LEN..], &packet[IPV4_HEADER_LEN..]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(link.asked, vec![(1, addr([10, 0, 1, 2]))]);
    }

    #[test]
    fn test_direct_route_resolves_destination() {
        let mut link = neighbours();
        let packet = datagram([10, 0, 1, 9], 64);
        let decision = forward(&table(), &mut link, &packet, addr(ROUTER));

        assert!(matches!(decision, Decision::Forward { interface: 1, .. }));
        assert_eq!(link.asked, vec![(1, addr([10, 0, 1, 9]))]);
    }

    #[test]
    fn test_ttl_exceeded() {
        let mut link = neighbours();
        let packet = datagram([10, 0, 5, 7], 1);

        match forward(&table(), &mut link, &packet, addr(ROUTER)) {
            Decision::TtlExceeded { reply } => {
                let ip = Ipv4Header::from_bytes(&reply).unwrap();
                assert_eq!(ip.src_addr, addr(ROUTER));
                assert_eq!(ip.dst_addr, addr([10, 0, 0, 2]));
                assert_eq!(reply[IPV4_HEADER_LEN], ICMP_TYPE_TIME_EXCEEDED);
                // the quoted header still carries the original TTL
                assert_eq!(&reply[IPV4_HEADER_LEN + 8..], &packet[..28]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let packet = datagram([10, 0, 5, 7], 0);
        assert!(matches!(
            forward(&table(), &mut link, &packet, addr(ROUTER)),
            Decision::TtlExceeded { .. }
        ));
    }

    #[test]
    fn test_unreachable() {
        let mut link = neighbours();
        for dst in [[192, 168, 0, 1], [10, 0, 6, 1]] {
            match forward(&table(), &mut link, &datagram(dst, 9), addr(ROUTER)) {
                Decision::Unreachable { reply } => {
                    assert_eq!(reply[IPV4_HEADER_LEN], ICMP_TYPE_DEST_UNREACHABLE);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(link.asked.is_empty());
    }

    #[test]
    fn test_no_link_address() {
        let mut link = neighbours();
        let decision = forward(&table(), &mut link, &datagram([10, 0, 0, 3], 9), addr(ROUTER));
        assert_eq!(
            decision,
            Decision::NoLinkAddress {
                interface: 0,
                next_hop: addr([10, 0, 0, 3]),
            }
        );
    }

    #[test]
    fn test_bad_checksum_is_malformed() {
        let mut link = neighbours();
        let mut packet = datagram([10, 0, 5, 7], 9);
        packet[CHECKSUM_OFFSET] ^= 0x40;
        assert_eq!(
            forward(&table(), &mut link, &packet, addr(ROUTER)),
            Decision::Malformed
        );
        assert_eq!(
            forward(&table(), &mut link, &packet[..12], addr(ROUTER)),
            Decision::Malformed
        );
    }

    #[test]
    fn test_truncated_datagram_is_malformed() {
        let mut link = neighbours();
        let header = Ipv4Header::new(
            protocol::UDP,
            9,
            addr([10, 0, 0, 2]),
            addr([10, 0, 5, 7]),
            100,
        );
        let mut packet = header.to_bytes().to_vec();
        packet.extend_from_slice(&[0xab; 10]);
        assert_eq!(
            forward(&table(), &mut link, &packet, addr(ROUTER)),
            Decision::Malformed
        );

        // total length shorter than the header itself
        let mut packet = datagram([10, 0, 5, 7], 9);
        BigEndian::write_u16(&mut packet[2..4], 16);
        let checksum = compute_checksum(&packet);
        BigEndian::write_u16(&mut packet[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2], checksum);
        assert_eq!(
            forward(&table(), &mut link, &packet, addr(ROUTER)),
            Decision::Malformed
        );
    }

    #[test]
    fn test_link_padding_is_not_forwarded() {
        let mut link = neighbours();
        let packet = datagram([10, 0, 5, 7], 9);
        let mut padded = packet.clone();
        padded.extend_from_slice(&[0; 14]);

        match forward(&table(), &mut link, &padded, addr(ROUTER)) {
            Decision::Forward { packet: out, .. } => {
                assert_eq!(out.len(), packet.len());
                assert_eq!(&out[IPV4_HEADER_LEN..], &packet[IPV4_HEADER_LEN..]);
                assert!(validate_checksum(&out));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decrement_ttl_matches_full_recompute() {
        for ttl in 2..=255u8 {
            let mut packet = datagram([10, 0, 5, 7], ttl);
            decrement_ttl(&mut packet);
            assert_eq!(packet[TTL_OFFSET], ttl - 1);
            let stored = BigEndian::read_u16(&packet[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2]);
            assert_eq!(stored, compute_checksum(&packet), "ttl {}", ttl);
        }
    }
}
