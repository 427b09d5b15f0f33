//! The decision engine of a small RIPv2 IPv4 router
//!
//! This library provides:
//! - a routing table with longest-prefix-match lookup
//! - the RIPv2 message codec and the distance-vector update rules
//! - the forwarding decision (checksum, TTL, ICMP errors)
//! - a router loop over pluggable link devices

pub mod config;
pub mod error;
pub mod forward;
pub mod iface;
pub mod logging;
pub mod network;
pub mod rip;
pub mod route;
pub mod router;
pub mod transport;

// Re-export commonly used types
pub use config::{InterfaceConfig, RouterConfig, UnreachablePolicy};
pub use error::{ChecksumError, RouterError};
pub use forward::{forward, Decision};
pub use iface::{Clock, LinkLayer, MacAddr, Received, SystemClock, TunLink};
pub use rip::{assemble, disassemble, Command, FormatError, RipMessage, RipRouteEntry};
pub use route::{InterfaceId, Route, RoutingTable};
pub use router::{Disposition, DropReason, Router};
