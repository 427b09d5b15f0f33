//! The link-layer boundary of the router.
//!
//! Everything that touches real devices lives behind [`LinkLayer`]: frame
//! reception, transmission and next-hop address resolution (ARP). The
//! router core only ever sees whole IPv4 datagrams.

use std::io;
use std::time::Instant;

use crate::route::InterfaceId;

/// A link-layer (Ethernet) address.
pub type MacAddr = [u8; 6];

/// The Ethernet group address of 224.0.0.9.
pub const RIP_MULTICAST_MAC: MacAddr = [0x01, 0x00, 0x5e, 0x00, 0x00, 0x09];

/// Outcome of polling the links for one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// `len` bytes were written to the buffer, received on `interface` from `src`.
    Frame {
        interface: InterfaceId,
        len: usize,
        src: MacAddr,
    },
    /// Nothing arrived this time.
    Idle,
    /// The links are gone; the router should stop.
    Closed,
}

/// Devices the router sends and receives IPv4 datagrams through.
pub trait LinkLayer {
    /// Receive one datagram into `buf`.
    fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<Received>;

    /// Send an IPv4 datagram out of `interface` to the link address `dest`.
    fn send_frame(&mut self, interface: InterfaceId, packet: &[u8], dest: MacAddr)
        -> io::Result<()>;

    /// Resolve the link address of `next_hop` (network-order) on `interface`.
    ///
    /// `None` means the address is not known yet; the datagram that needed
    /// it is dropped.
    fn resolve_link_address(&mut self, interface: InterfaceId, next_hop: u32) -> Option<MacAddr>;
}

/// Source of the current time for the update timer.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The system's monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
