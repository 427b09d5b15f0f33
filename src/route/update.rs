//! Distance-vector route learning and advertisement (RFC 2453 3.9).

use tracing::{debug, info, warn};

use super::{mask, prefix_len_of, InterfaceId, Route, RoutingTable, INFINITY};
use crate::network::ipv4::to_ipv4;
use crate::rip::{Command, RipMessage, RipRouteEntry, MAX_ENTRIES};

/// What one response did to the table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    /// New prefixes learned
    pub added: usize,
    /// Routes confirmed by the neighbour they were learned from
    pub refreshed: usize,
    /// Routes moved to a strictly better path
    pub replaced: usize,
    /// Routes withdrawn by their neighbour
    pub removed: usize,
    /// Entries that changed nothing
    pub ignored: usize,
    /// New prefixes dropped because the table was full
    pub rejected: usize,
}

impl UpdateSummary {
    /// Whether any route was added, changed or removed.
    pub fn changed(&self) -> bool {
        self.added + self.refreshed + self.replaced + self.removed > 0
    }
}

/// Apply the entries of a RIP response received on `ingress` from
/// `advertiser` (a network-order address) to `table`.
///
/// Directly connected routes are never touched, and a response from
/// 0.0.0.0 is ignored as a whole. The entries are expected
/// to have passed [`crate::rip::disassemble`], so their masks are contiguous.
pub fn apply_response(
    table: &mut RoutingTable,
    entries: &[RipRouteEntry],
    ingress: InterfaceId,
    advertiser: u32,
) -> UpdateSummary {
    let mut summary = UpdateSummary::default();

    // a zero next hop marks a direct route; nothing learned may carry one
    if advertiser == 0 {
        warn!(interface = ingress, "ignoring response from 0.0.0.0");
        summary.ignored = entries.len();
        return summary;
    }

    for entry in entries {
        let Some(prefix_len) = prefix_len_of(entry.mask) else {
            warn!(mask = u32::from_be(entry.mask), "skipping entry with a bad mask");
            summary.ignored += 1;
            continue;
        };
        let prefix = entry.address & mask(prefix_len);
        let metric = entry.host_metric().saturating_add(1);

        let learned = Route {
            prefix,
            prefix_len,
            egress_interface: ingress,
            next_hop: advertiser,
            metric,
            learned_from_interface: ingress,
        };

        match table.get(prefix, prefix_len).copied() {
            Some(existing) if existing.is_direct() => summary.ignored += 1,
            Some(existing) if existing.egress_interface == ingress => {
                if metric > INFINITY {
                    table.remove(prefix, prefix_len);
                    info!(
                        prefix = %to_ipv4(prefix),
                        prefix_len,
                        interface = ingress,
                        "route withdrawn"
                    );
                    summary.removed += 1;
                } else {
                    table.upsert(learned);
                    summary.refreshed += 1;
                }
            }
            Some(existing) => {
                if metric < existing.metric {
                    table.upsert(learned);
                    info!(
                        prefix = %to_ipv4(prefix),
                        prefix_len,
                        from = existing.egress_interface,
                        to = ingress,
                        metric,
                        "route replaced by a shorter path"
                    );
                    summary.replaced += 1;
                } else {
                    summary.ignored += 1;
                }
            }
            None if metric > INFINITY => summary.ignored += 1,
            None if table.is_full() => {
                warn!(
                    prefix = %to_ipv4(prefix),
                    prefix_len,
                    "routing table full, route not learned"
                );
                summary.rejected += 1;
            }
            None => {
                table.upsert(learned);
                info!(
                    prefix = %to_ipv4(prefix),
                    prefix_len,
                    interface = ingress,
                    next_hop = %to_ipv4(advertiser),
                    metric,
                    "route learned"
                );
                summary.added += 1;
            }
        }
    }

    debug!(?summary, interface = ingress, "applied RIP response");
    summary
}

/// Build the responses advertising `table` out of interface `egress`.
///
/// Routes that leave through `egress` are left out (split horizon). Each
/// record names `local_addr`, the sending interface's address, as next hop.
/// The result is split into messages of at most 25 records; an empty
/// advertisement yields no messages.
pub fn build_responses(
    table: &RoutingTable,
    egress: InterfaceId,
    local_addr: u32,
) -> Vec<RipMessage> {
    let mut routes: Vec<&Route> = table
        .iter()
        .filter(|route| route.egress_interface != egress)
        .collect();
    routes.sort_by_key(|route| (u32::from_be(route.prefix), route.prefix_len));

    let entries: Vec<RipRouteEntry> = routes
        .into_iter()
        .map(|route| RipRouteEntry {
            address: route.prefix,
            mask: mask(route.prefix_len),
            next_hop: local_addr,
            metric: route.metric.min(INFINITY).to_be(),
        })
        .collect();

    entries
        .chunks(MAX_ENTRIES)
        .map(|chunk| RipMessage::new(Command::Response, chunk.to_vec()))
        .collect()
}

/// Answer a request for specific prefixes (RFC 2453 3.9.1).
///
/// Every requested record comes back with the metric of the matching route,
/// or 16 when the prefix is unknown. Split horizon does not apply: the
/// requester asked for these routes explicitly.
pub fn answer_request(table: &RoutingTable, request: &RipMessage) -> RipMessage {
    let entries = request
        .entries
        .iter()
        .map(|entry| {
            let metric = prefix_len_of(entry.mask)
                .and_then(|len| table.get(entry.address & mask(len), len))
                .map_or(INFINITY, |route| route.metric.min(INFINITY));
            RipRouteEntry {
                metric: metric.to_be(),
                ..*entry
            }
        })
        .collect();

    RipMessage::new(Command::Response, entries)
}
