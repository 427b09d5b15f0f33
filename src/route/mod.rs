//! The routing table
//!
//! Routes are keyed by `(prefix, prefix_len)`. Addresses, prefixes, masks and
//! next hops are `u32` values holding the four address octets in memory
//! order ("network byte order"), so a prefix can be compared against
//! `addr & mask(len)` without any byte swapping. Metrics and lengths are
//! plain host integers.
//!
//! Lookup walks the prefix lengths present in the table from longest to
//! shortest and looks the map up once per length, so the cost depends on the
//! number of distinct lengths rather than on the number of routes.

pub mod update;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::network::ipv4::to_ipv4;

pub use update::{answer_request, apply_response, build_responses, UpdateSummary};

/// Index of a router interface.
pub type InterfaceId = u32;

/// RIP's "infinity": a route with this metric is unreachable.
pub const INFINITY: u32 = 16;

const fn build_masks() -> [u32; 33] {
    let mut masks = [0u32; 33];
    let mut len = 1;
    while len <= 32 {
        masks[len] = (u32::MAX << (32 - len)).to_be();
        len += 1;
    }
    masks
}

/// `MASKS[len]` is the network-order mask for a prefix of `len` bits.
static MASKS: [u32; 33] = build_masks();

/// Network-order mask for `prefix_len` leading bits. Lengths above 32 are
/// treated as 32.
pub fn mask(prefix_len: u8) -> u32 {
    MASKS[prefix_len.min(32) as usize]
}

/// Whether a host-order mask is a run of ones followed by a run of zeros.
pub fn is_contiguous_mask(host_mask: u32) -> bool {
    host_mask.leading_ones() + host_mask.trailing_zeros() == 32
}

/// Prefix length of a network-order mask, or `None` if it is not contiguous.
pub fn prefix_len_of(network_mask: u32) -> Option<u8> {
    let host_mask = u32::from_be(network_mask);
    is_contiguous_mask(host_mask).then(|| host_mask.leading_ones() as u8)
}

/// One forwarding entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub prefix: u32,
    pub prefix_len: u8,
    pub egress_interface: InterfaceId,
    /// Zero for a directly connected network.
    pub next_hop: u32,
    pub metric: u32,
    pub learned_from_interface: InterfaceId,
}

impl Route {
    /// A route to a network attached to `interface`.
    pub fn direct(prefix: u32, prefix_len: u8, interface: InterfaceId) -> Self {
        Route {
            prefix: prefix & mask(prefix_len),
            prefix_len,
            egress_interface: interface,
            next_hop: 0,
            metric: 1,
            learned_from_interface: interface,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.next_hop == 0
    }

    pub fn is_reachable(&self) -> bool {
        self.metric < INFINITY
    }

    /// Whether `addr` falls inside this route's prefix.
    pub fn contains(&self, addr: u32) -> bool {
        addr & mask(self.prefix_len) == self.prefix
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next_hop = if self.is_direct() {
            "direct".to_string()
        } else {
            to_ipv4(self.next_hop).to_string()
        };
        write!(
            f,
            "{}/{}\t{}\t{}\t{}\t{}",
            to_ipv4(self.prefix),
            self.prefix_len,
            self.egress_interface,
            next_hop,
            self.metric,
            self.learned_from_interface
        )
    }
}

/// The set of known routes, at most one per `(prefix, prefix_len)`.
#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    routes: HashMap<(u32, u8), Route>,
    // number of routes per prefix length, walked longest first on lookup
    lengths: BTreeMap<u8, usize>,
    limit: Option<usize>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that reports itself full once it holds `limit` routes.
    ///
    /// The limit is advisory: [`RoutingTable::upsert`] still succeeds, but
    /// route learning checks [`RoutingTable::is_full`] before inserting.
    pub fn with_limit(limit: usize) -> Self {
        RoutingTable {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.limit.map_or(false, |limit| self.routes.len() >= limit)
    }

    /// Insert `route`, replacing any route with the same prefix and length.
    ///
    /// Returns the replaced route.
    pub fn upsert(&mut self, route: Route) -> Option<Route> {
        let key = (route.prefix, route.prefix_len);
        let previous = self.routes.insert(key, route);
        if previous.is_none() {
            *self.lengths.entry(route.prefix_len).or_insert(0) += 1;
        }
        previous
    }

    /// Delete the route for `(prefix, prefix_len)`, if there is one.
    pub fn remove(&mut self, prefix: u32, prefix_len: u8) -> Option<Route> {
        let removed = self.routes.remove(&(prefix, prefix_len))?;

        if let Some(count) = self.lengths.get_mut(&prefix_len) {
            *count -= 1;
            if *count == 0 {
                self.lengths.remove(&prefix_len);
            }
        }
        Some(removed)
    }

    /// The route stored under exactly `(prefix, prefix_len)`.
    pub fn get(&self, prefix: u32, prefix_len: u8) -> Option<&Route> {
        self.routes.get(&(prefix, prefix_len))
    }

    /// Longest-prefix-match lookup for `addr`.
    ///
    /// A route with metric 16 can be returned; callers decide whether an
    /// unreachable route counts as a match.
    pub fn lookup(&self, addr: u32) -> Option<Route> {
        self.lengths
            .keys()
            .rev()
            .find_map(|&len| self.routes.get(&(addr & mask(len), len)))
            .copied()
    }

    /// All routes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut routes: Vec<&Route> = self.routes.values().collect();
        routes.sort_by_key(|r| (u32::from_be(r.prefix), r.prefix_len));

        writeln!(f, "prefix\tif\tnext hop\tmetric\tfrom")?;
        routes
            .iter()
            .fold(Ok(()), |acc, route| acc.and_then(|_| writeln!(f, "{}", route)))
    }
}
